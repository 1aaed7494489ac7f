//! Deterministic byte-level tokenizer.
//!
//! Ids `0..3` are reserved for specials; every byte `b` maps to `b + 3`.

use crate::errors::HandlerError;

pub(crate) const PAD_ID: u32 = 0;
pub(crate) const BOS_ID: u32 = 1;
pub(crate) const EOS_ID: u32 = 2;
const BYTE_OFFSET: u32 = 3;
pub(crate) const VOCAB_SIZE: u32 = 256 + BYTE_OFFSET;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ByteTokenizer;

impl ByteTokenizer {
    pub(crate) fn encode(self, text: &str, add_bos: bool) -> Vec<u32> {
        let mut ids = Vec::with_capacity(text.len() + usize::from(add_bos));
        if add_bos {
            ids.push(BOS_ID);
        }
        ids.extend(text.bytes().map(|byte| u32::from(byte) + BYTE_OFFSET));
        ids
    }

    /// Decodes ids back to text, skipping specials.
    pub(crate) fn decode(self, ids: &[u32]) -> Result<String, HandlerError> {
        let mut bytes = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(byte) = self.byte_for(id)? {
                bytes.push(byte);
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Text rendering of a single id, used for `with_pieces`.
    pub(crate) fn piece(self, id: u32) -> Result<String, HandlerError> {
        Ok(match id {
            PAD_ID => "<pad>".to_owned(),
            BOS_ID => "<s>".to_owned(),
            EOS_ID => "</s>".to_owned(),
            _ => match self.byte_for(id)? {
                Some(byte) => String::from_utf8_lossy(&[byte]).into_owned(),
                None => String::new(),
            },
        })
    }

    fn byte_for(self, id: u32) -> Result<Option<u8>, HandlerError> {
        if id >= VOCAB_SIZE {
            return Err(HandlerError::invalid_request(format!(
                "token id {id} out of range (vocab={VOCAB_SIZE})"
            )));
        }
        Ok(id
            .checked_sub(BYTE_OFFSET)
            .and_then(|value| u8::try_from(value).ok()))
    }
}
