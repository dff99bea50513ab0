use pem::{EncodeConfig, LineEnding, Pem};

use crate::error::{PkiError, Result};

fn encode_config() -> EncodeConfig {
    EncodeConfig::new().set_line_ending(LineEnding::LF)
}

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    pem::encode_config(&Pem::new(label, der), encode_config())
}

/// Concatenate several labelled DER blobs into one PEM document.
pub fn ders_to_pem(blocks: &[(&str, &[u8])]) -> String {
    let pems: Vec<Pem> = blocks
        .iter()
        .map(|(label, der)| Pem::new(*label, *der))
        .collect();
    pem::encode_many_config(&pems, encode_config())
}

/// Find the single block labelled `label` in a PEM document and return its DER contents.
pub fn find_block(pem_str: &str, label: &str) -> Result<Vec<u8>> {
    let mut blocks = pem::parse_many(pem_str)?
        .into_iter()
        .filter(|block| block.tag() == label);
    match (blocks.next(), blocks.next()) {
        (Some(block), None) => Ok(block.into_contents()),
        (None, _) => Err(PkiError::DecodingError(format!("No {label} block found"))),
        (Some(_), Some(_)) => Err(PkiError::DecodingError(format!(
            "More than one {label} block found"
        ))),
    }
}
