//! Dictionary-preset raw DEFLATE for small text blobs.
//!
//! Most stored content is short source text, where a plain DEFLATE stream
//! spends most of its budget on literals seen in every file. Presetting the
//! window with a dictionary of common tokens lets even tiny blobs refer back
//! to them. Compressor and decompressor must use the same dictionary, so
//! changing [`DICTIONARY`] is a storage format change.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::Result;
use crate::Error;

pub const DICTIONARY: &[u8] = b"\
    </div></span></td></tr></table></body></html>\n\
    <?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
    #include <stdio.h> #define #ifdef #ifndef #endif \
    import java.util.*; import java.io.*; package \
    use std::collections::HashMap; use crate::error::Result; \
    pub fn pub struct pub enum impl fn let mut match Some( None Ok( Err( \
    public class private static final protected abstract interface extends implements \
    synchronized volatile transient native throws throw new this super \
    void boolean byte char short int long float double String Object \
    if (  else { } for (int i = 0; i < ; i++) { while ( return null; \
    return true; return false; try { } catch (Exception e) { } finally { \
    @Override @Nullable @NotNull @Deprecated @Test \
    /**\n * @param @return @throws @see {@link */\n// \
    def self __init__ import from class return None True False lambda \
    function var const let => async await export default require( module.exports \
    .length .size() .get( .put( .add( .equals( .toString() .hashCode() \
    getName() getValue() setName( setValue( getInstance() \
    System.out.println( assertEquals( assertTrue( assertNull( \
    <div class=\"\"> <span> <a href=\"\"> <table> <tr> <td> \
    </project></dependency><groupId></groupId><artifactId></artifactId><version></version>\n\
    ";

/// Compresses `data`, returning `None` when the result would not be smaller.
pub fn compress(data: &[u8]) -> Result<Option<Vec<u8>>> {
    if data.is_empty() {
        return Ok(None);
    }

    let mut compressor = Compress::new(Compression::best(), false);
    compressor
        .set_dictionary(DICTIONARY)
        .map_err(|e| Error::Compression(e.to_string()))?;

    // An output buffer no larger than the input doubles as the
    // "worth it" check: if the stream does not fit, keep the raw bytes.
    let mut out = Vec::with_capacity(data.len());
    let status = compressor
        .compress_vec(data, &mut out, FlushCompress::Finish)
        .map_err(|e| Error::Compression(e.to_string()))?;

    match status {
        Status::StreamEnd if out.len() < data.len() => Ok(Some(out)),
        _ => Ok(None),
    }
}

/// Inverse of [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(false);
    inflater
        .set_dictionary(DICTIONARY)
        .map_err(|e| Error::Compression(e.to_string()))?;

    let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(64));
    loop {
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();

        let status = inflater
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| Error::Compression(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                if out.len() == out.capacity() {
                    out.reserve(out.capacity());
                } else if inflater.total_in() as usize == consumed
                    && inflater.total_out() == produced
                {
                    return Err(Error::Compression(
                        "truncated compressed payload".to_string(),
                    ));
                }
            }
        }
    }
}
