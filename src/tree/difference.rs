use super::entry::{Entry, EntryKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    Created,
    Deleted,
    Modified,
    NotModified,
}

/// Structural comparison of two entry trees. Children are paired by id, so a
/// renamed or moved entry is reported as modified, not as delete plus create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference<'a> {
    pub kind: DifferenceKind,
    pub left: Option<&'a Entry>,
    pub right: Option<&'a Entry>,
    pub children: Vec<Difference<'a>>,
}

impl<'a> Difference<'a> {
    pub fn between(left: &'a Entry, right: &'a Entry) -> Self {
        let kind = if is_modified(left, right) {
            DifferenceKind::Modified
        } else {
            DifferenceKind::NotModified
        };

        let mut children = Vec::new();
        for l in left.children() {
            match right.children().iter().find(|r| r.id() == l.id()) {
                Some(r) => children.push(Difference::between(l, r)),
                None => children.push(Difference::deleted(l)),
            }
        }
        for r in right.children() {
            if !left.children().iter().any(|l| l.id() == r.id()) {
                children.push(Difference::created(r));
            }
        }

        Self {
            kind,
            left: Some(left),
            right: Some(right),
            children,
        }
    }

    pub fn created(entry: &'a Entry) -> Self {
        Self {
            kind: DifferenceKind::Created,
            left: None,
            right: Some(entry),
            children: entry.children().iter().map(Difference::created).collect(),
        }
    }

    pub fn deleted(entry: &'a Entry) -> Self {
        Self {
            kind: DifferenceKind::Deleted,
            left: Some(entry),
            right: None,
            children: entry.children().iter().map(Difference::deleted).collect(),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.kind != DifferenceKind::NotModified
    }

    /// True if this node or anything below it changed.
    pub fn has_difference(&self) -> bool {
        self.is_modified() || self.children.iter().any(Difference::has_difference)
    }

    /// Flattens the tree into the changed nodes, parents first.
    pub fn changed(&self) -> Vec<&Difference<'a>> {
        let mut out = Vec::new();
        self.collect_changed(&mut out);
        out
    }

    fn collect_changed<'s>(&'s self, out: &mut Vec<&'s Difference<'a>>) {
        if self.is_modified() {
            out.push(self);
        }
        for child in &self.children {
            child.collect_changed(out);
        }
    }
}

fn is_modified(left: &Entry, right: &Entry) -> bool {
    if left.name() != right.name() {
        return true;
    }
    match (left.kind(), right.kind()) {
        (
            EntryKind::File {
                content: lc,
                timestamp: lt,
            },
            EntryKind::File {
                content: rc,
                timestamp: rt,
            },
        ) => lc != rc || lt != rt,
        (EntryKind::Directory { .. }, EntryKind::Directory { .. }) => false,
        _ => true,
    }
}
