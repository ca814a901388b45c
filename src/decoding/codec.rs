use std::collections::HashMap;
use std::path::Path;

use crate::error::MetricError;
use crate::pipeline::traits::TokenCodec;
use crate::types::TokenId;

/// SentencePiece word-boundary marker.
pub const WORD_BOUNDARY: char = '\u{2581}';
pub const DEFAULT_WORD_DELIMITER: char = '|';

/// Which codec a vocabulary file should be loaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    SentencePiece,
    Char,
}

impl CodecKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SentencePiece => "sentencepiece",
            Self::Char => "char",
        }
    }
}

/// Subword codec: pieces are concatenated and `▁` becomes a space.
#[derive(Debug, Clone)]
pub struct SentencePieceCodec {
    pieces: Vec<String>,
}

impl SentencePieceCodec {
    pub fn from_pieces<I, S>(pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pieces: pieces.into_iter().map(Into::into).collect(),
        }
    }

    /// `{"piece": id, ...}` with dense ids.
    pub fn from_vocab_json(path: &Path) -> Result<Self, MetricError> {
        Ok(Self {
            pieces: load_vocab_json(path)?,
        })
    }

    /// SentencePiece `.vocab` export: one `piece<TAB>score` line per id.
    pub fn from_sentencepiece_vocab(path: &Path) -> Result<Self, MetricError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| MetricError::io("read sentencepiece vocab", e))?;
        let pieces = data
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.split('\t').next().unwrap_or(line).to_string())
            .collect();
        Ok(Self { pieces })
    }

    fn piece(&self, id: TokenId) -> Result<&str, MetricError> {
        self.pieces
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| MetricError::unknown_token(id, self.pieces.len()))
    }
}

impl TokenCodec for SentencePieceCodec {
    fn ids_to_text(&self, ids: &[TokenId]) -> Result<String, MetricError> {
        let mut joined = String::new();
        for &id in ids {
            joined.push_str(self.piece(id)?);
        }
        Ok(joined.replace(WORD_BOUNDARY, " ").trim().to_string())
    }

    fn ids_to_tokens(&self, ids: &[TokenId]) -> Result<Vec<String>, MetricError> {
        ids.iter()
            .map(|&id| self.piece(id).map(str::to_string))
            .collect()
    }

    fn vocab_size(&self) -> usize {
        self.pieces.len()
    }
}

/// Character codec in the wav2vec2 style: one symbol per id, a delimiter
/// symbol between words. Multi-character entries (`<pad>`, `<unk>`, ...) are
/// special tokens and render as nothing.
#[derive(Debug, Clone)]
pub struct CharCodec {
    symbols: Vec<String>,
    word_delimiter: char,
}

impl CharCodec {
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        Self {
            symbols: chars.into_iter().map(String::from).collect(),
            word_delimiter: DEFAULT_WORD_DELIMITER,
        }
    }

    pub fn from_vocab_json(path: &Path) -> Result<Self, MetricError> {
        Ok(Self {
            symbols: load_vocab_json(path)?,
            word_delimiter: DEFAULT_WORD_DELIMITER,
        })
    }

    pub fn with_word_delimiter(mut self, word_delimiter: char) -> Self {
        self.word_delimiter = word_delimiter;
        self
    }

    fn symbol(&self, id: TokenId) -> Result<&str, MetricError> {
        self.symbols
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| MetricError::unknown_token(id, self.symbols.len()))
    }
}

impl TokenCodec for CharCodec {
    fn ids_to_text(&self, ids: &[TokenId]) -> Result<String, MetricError> {
        let mut text = String::with_capacity(ids.len());
        for &id in ids {
            let symbol = self.symbol(id)?;
            let mut chars = symbol.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c == self.word_delimiter => text.push(' '),
                (Some(c), None) => text.push(c),
                _ => {}
            }
        }
        Ok(text.trim().to_string())
    }

    fn ids_to_tokens(&self, ids: &[TokenId]) -> Result<Vec<String>, MetricError> {
        ids.iter()
            .map(|&id| self.symbol(id).map(str::to_string))
            .collect()
    }

    fn vocab_size(&self) -> usize {
        self.symbols.len()
    }
}

pub fn load_codec(path: &Path, kind: CodecKind) -> Result<Box<dyn TokenCodec>, MetricError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let codec: Box<dyn TokenCodec> = match kind {
        CodecKind::SentencePiece if is_json => Box::new(SentencePieceCodec::from_vocab_json(path)?),
        CodecKind::SentencePiece => Box::new(SentencePieceCodec::from_sentencepiece_vocab(path)?),
        CodecKind::Char => Box::new(CharCodec::from_vocab_json(path)?),
    };
    tracing::debug!(
        path = %path.display(),
        kind = kind.as_str(),
        vocab_size = codec.vocab_size(),
        "codec: vocabulary loaded"
    );
    Ok(codec)
}

/// Reads a `{"token": id}` map and orders it by id. Ids must cover `0..len`.
fn load_vocab_json(path: &Path) -> Result<Vec<String>, MetricError> {
    let data =
        std::fs::read_to_string(path).map_err(|e| MetricError::io("read vocab.json", e))?;
    let raw: HashMap<String, usize> =
        serde_json::from_str(&data).map_err(|e| MetricError::json("parse vocab.json", e))?;
    dense_vocab(raw)
}

fn dense_vocab(raw: HashMap<String, usize>) -> Result<Vec<String>, MetricError> {
    let mut slots: Vec<Option<String>> = vec![None; raw.len()];
    for (token, id) in raw {
        let slot = slots.get_mut(id).ok_or_else(|| {
            MetricError::invalid_input(format!("vocab id {id} for {token:?} leaves a gap"))
        })?;
        if slot.is_some() {
            return Err(MetricError::invalid_input(format!(
                "vocab id {id} is assigned twice"
            )));
        }
        *slot = Some(token);
    }
    // len(raw) slots, no duplicates, all ids in range: every slot is filled.
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spm() -> SentencePieceCodec {
        SentencePieceCodec::from_pieces(["<unk>", "\u{2581}the", "\u{2581}c", "at", "\u{2581}sat", "s"])
    }

    #[test]
    fn sentencepiece_joins_pieces_on_word_boundaries() {
        let codec = spm();
        assert_eq!(codec.ids_to_text(&[1, 2, 3, 4]).unwrap(), "the cat sat");
        assert_eq!(codec.ids_to_text(&[2, 3, 5]).unwrap(), "cats");
    }

    #[test]
    fn sentencepiece_empty_input() {
        assert_eq!(spm().ids_to_text(&[]).unwrap(), "");
        assert!(spm().ids_to_tokens(&[]).unwrap().is_empty());
    }

    #[test]
    fn sentencepiece_tokens_are_raw_pieces() {
        let tokens = spm().ids_to_tokens(&[2, 3]).unwrap();
        assert_eq!(tokens, ["\u{2581}c", "at"]);
    }

    #[test]
    fn blank_id_is_vocab_size() {
        assert_eq!(spm().blank_id(), 6);
        assert_eq!(CharCodec::from_chars("ab|".chars()).blank_id(), 3);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let err = spm().ids_to_text(&[1, 6]).unwrap_err();
        assert!(matches!(
            err,
            MetricError::UnknownToken {
                id: 6,
                vocab_size: 6
            }
        ));
        assert!(CharCodec::from_chars("ab".chars()).ids_to_tokens(&[7]).is_err());
    }

    #[test]
    fn char_codec_maps_delimiter_to_space() {
        let codec = CharCodec::from_chars("abc|".chars());
        assert_eq!(codec.ids_to_text(&[3, 0, 1, 3, 2, 3]).unwrap(), "ab c");
        assert_eq!(codec.ids_to_tokens(&[0, 3]).unwrap(), ["a", "|"]);
    }

    #[test]
    fn char_codec_custom_delimiter() {
        let codec = CharCodec::from_chars("ab_".chars()).with_word_delimiter('_');
        assert_eq!(codec.ids_to_text(&[0, 2, 1]).unwrap(), "a b");
    }

    #[test]
    fn char_codec_vocab_json_skips_special_tokens_in_text() {
        let path = std::env::temp_dir().join("ctc_error_rate_char_vocab.json");
        std::fs::write(&path, r#"{"<pad>": 0, "a": 1, "b": 2, "|": 3}"#).expect("write vocab");
        let codec = CharCodec::from_vocab_json(&path).expect("load vocab");
        assert_eq!(codec.vocab_size(), 4);
        assert_eq!(codec.ids_to_text(&[0, 1, 3, 2]).unwrap(), "a b");
        assert_eq!(codec.ids_to_tokens(&[0]).unwrap(), ["<pad>"]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn sentencepiece_vocab_file_uses_line_order() {
        let path = std::env::temp_dir().join("ctc_error_rate_spm.vocab");
        std::fs::write(&path, "<unk>\t0\n\u{2581}hi\t-1.5\nya\t-2.0\n").expect("write vocab");
        let codec = SentencePieceCodec::from_sentencepiece_vocab(&path).expect("load vocab");
        assert_eq!(codec.vocab_size(), 3);
        assert_eq!(codec.ids_to_text(&[1, 2]).unwrap(), "hiya");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn vocab_json_with_gap_is_rejected() {
        let raw = HashMap::from([("a".to_string(), 0), ("b".to_string(), 2)]);
        assert!(matches!(
            dense_vocab(raw),
            Err(MetricError::InvalidInput { .. })
        ));
    }

    #[test]
    fn load_codec_dispatches_on_kind() {
        let path = std::env::temp_dir().join("ctc_error_rate_load_codec.json");
        std::fs::write(&path, "{\"\u{2581}x\": 0, \"y\": 1}").expect("write vocab");
        let codec = load_codec(&path, CodecKind::SentencePiece).expect("load codec");
        assert_eq!(codec.ids_to_text(&[0, 1]).unwrap(), "xy");
        assert!(load_codec(Path::new("/nonexistent/vocab.json"), CodecKind::Char).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
