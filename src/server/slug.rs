//! Key normalization for catalog names on the wire.
//!
//! List and detail endpoints expose catalog values twice: the stored display
//! name and a machine key derived from it. The derivation is intentionally
//! narrow: lowercase, spaces to hyphens, and only the accented vowels that
//! actually occur in the seeded names.

/// Full key form used by requirement catalogs and flattened lookups
/// ("No funcional" -> "no-funcional", "Revisión" -> "revision" stays out of
/// scope: only ó and í are folded).
#[must_use]
pub fn slug_key(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "-")
        .replace('ó', "o")
        .replace('í', "i")
}

/// Status key form used by use-case listings: hyphenation without accent
/// folding.
#[must_use]
pub fn status_key(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_key_folds_accents() {
        assert_eq!(slug_key("No funcional"), "no-funcional");
        assert_eq!(slug_key("En revisión"), "en-revision");
        assert_eq!(slug_key("Crítico"), "critico");
    }

    #[test]
    fn test_status_key_keeps_accents() {
        assert_eq!(status_key("En revisión"), "en-revisión");
        assert_eq!(status_key("Pendiente"), "pendiente");
    }
}
