use crate::{Emitter, Encoding, WriterError};

/// Flush the accumulated characters into the emitter's output buffer.
pub fn yaml_emitter_flush(emitter: &mut Emitter) -> Result<(), WriterError> {
    if emitter.buffer.is_empty() {
        return Ok(());
    }

    if emitter.encoding == Encoding::Any || emitter.encoding == Encoding::Utf8 {
        emitter.output.extend_from_slice(emitter.buffer.as_bytes());
        emitter.buffer.clear();
        return Ok(());
    }

    let big_endian = emitter.encoding == Encoding::Utf16Be;

    for ch in emitter.buffer.encode_utf16() {
        let bytes = if big_endian {
            ch.to_be_bytes()
        } else {
            ch.to_le_bytes()
        };
        emitter.raw_buffer.extend(bytes);
    }

    emitter.output.extend_from_slice(&emitter.raw_buffer);
    emitter.buffer.clear();
    emitter.raw_buffer.clear();
    Ok(())
}
