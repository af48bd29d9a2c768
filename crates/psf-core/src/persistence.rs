//! Flat attribute persistence.
//!
//! A PSF source is stored as `name="value"` pairs, separated by whitespace or
//! newlines. Lines starting with `#` are comments. The `model` key selects
//! the model kind; every other key is a parameter name from that model's
//! table:
//!
//! ```text
//! model="gibson-lanni"
//! emission_wavelength="550"
//! numerical_aperture="1.4"
//! ```
//!
//! Reading is tolerant: unknown keys are logged and skipped, and parameters
//! that are absent keep their current value. Floats are written with Rust's
//! shortest round-trip formatting, so a write/read cycle is lossless.

use std::fmt::Write;

use crate::error::PsfError;
use crate::models::ModelKind;
use crate::source::PsfSource;

/// Key that carries the model kind.
pub const MODEL_KEY: &str = "model";

/// Serialize every parameter of `source`.
pub fn to_attributes(source: &PsfSource) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{MODEL_KEY}=\"{}\"", source.kind().key());
    for info in source.parameters() {
        let _ = writeln!(out, "{}=\"{}\"", info.name, info.value);
    }
    out
}

/// Apply the attributes in `text` to `source`.
///
/// Returns the number of parameters that were set. The model key, when
/// present, is applied first regardless of where it appears. The update is
/// all or nothing: on error `source` is left exactly as it was.
pub fn apply_attributes(source: &mut PsfSource, text: &str) -> Result<usize, PsfError> {
    let pairs = parse_pairs(text)?;
    let mut staged = source.clone();
    let applied = apply_pairs(&mut staged, &pairs)?;
    *source = staged;
    Ok(applied)
}

fn apply_pairs(source: &mut PsfSource, pairs: &[(&str, &str)]) -> Result<usize, PsfError> {
    if let Some((_, kind)) = pairs.iter().find(|(key, _)| *key == MODEL_KEY) {
        let kind: ModelKind = kind.parse().map_err(|_| PsfError::MalformedAttribute {
            key: MODEL_KEY.to_string(),
            value: kind.to_string(),
        })?;
        source.set_kind(kind);
    }

    let mut applied = 0;
    for (key, raw) in pairs.iter().filter(|(key, _)| *key != MODEL_KEY) {
        let value: f64 = raw.trim().parse().map_err(|_| PsfError::MalformedAttribute {
            key: key.to_string(),
            value: raw.to_string(),
        })?;
        match source.set(key, value) {
            Ok(()) => applied += 1,
            Err(PsfError::UnknownParameter(_)) => {
                log::warn!("Ignoring unknown attribute '{key}' for {}", source.kind());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(applied)
}

impl PsfSource {
    /// Build a source from attribute text, starting from defaults.
    pub fn from_attributes(text: &str) -> Result<Self, PsfError> {
        let mut source = PsfSource::default();
        apply_attributes(&mut source, text)?;
        Ok(source)
    }

    /// Serialize this source as attribute text.
    pub fn to_attributes(&self) -> String {
        to_attributes(self)
    }
}

/// Split `text` into `(key, value)` pairs.
fn parse_pairs(text: &str) -> Result<Vec<(&str, &str)>, PsfError> {
    let mut pairs = Vec::new();
    for line in text.lines() {
        let mut rest = line.trim();
        if rest.starts_with('#') {
            continue;
        }
        while !rest.is_empty() {
            let malformed = || PsfError::MalformedAttribute {
                key: rest.split('=').next().unwrap_or(rest).trim().to_string(),
                value: rest.to_string(),
            };
            let eq = rest.find('=').ok_or_else(malformed)?;
            let key = rest[..eq].trim();
            let after = rest[eq + 1..].trim_start();
            let quoted = after.strip_prefix('"').ok_or_else(malformed)?;
            let close = quoted.find('"').ok_or_else(malformed)?;
            if key.is_empty() || key.contains(char::is_whitespace) {
                return Err(malformed());
            }
            pairs.push((key, &quoted[..close]));
            rest = quoted[close + 1..].trim_start();
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs_on_one_line_and_many() {
        let pairs = parse_pairs("a=\"1\" b=\"2\"\n# c=\"3\"\n  d = \"4\"").unwrap();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2"), ("d", "4")]);
    }

    #[test]
    fn test_parse_pairs_rejects_unquoted_value() {
        assert!(matches!(
            parse_pairs("numerical_aperture=1.4"),
            Err(PsfError::MalformedAttribute { .. })
        ));
        assert!(parse_pairs("numerical_aperture=\"1.4").is_err());
    }

    #[test]
    fn test_model_key_applied_first() {
        let text = "gaussian_sigma_x=\"150\"\nmodel=\"modified-gibson-lanni\"\n";
        let source = PsfSource::from_attributes(text).unwrap();
        assert_eq!(source.kind(), ModelKind::ModifiedGibsonLanni);
        assert_eq!(source.gaussian().sigma_nm[0], 150.0);
    }

    #[test]
    fn test_malformed_number() {
        let mut source = PsfSource::default();
        let err = apply_attributes(&mut source, "magnification=\"sixty\"").unwrap_err();
        match err {
            PsfError::MalformedAttribute { key, value } => {
                assert_eq!(key, "magnification");
                assert_eq!(value, "sixty");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_failed_apply_leaves_source_untouched() {
        let mut source = PsfSource::new(ModelKind::GibsonLanni);
        let before = source.clone();
        let text = "model=\"widefield\" numerical_aperture=\"1.2\" magnification=\"sixty\"";
        assert!(apply_attributes(&mut source, text).is_err());
        assert_eq!(source, before);

        let text = "numerical_aperture=\"1.2\" size_x=\"2.5\"";
        assert!(matches!(
            apply_attributes(&mut source, text),
            Err(PsfError::InvalidParameterValue { .. })
        ));
        assert_eq!(source, before);
    }

    #[test]
    fn test_unknown_model() {
        assert!(PsfSource::from_attributes("model=\"confocal\"").is_err());
    }
}
