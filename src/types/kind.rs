use serde::{Deserialize, Serialize};

/// The entity family an element status applies to.
///
/// Stored as the tag column of `estados_elemento`; status names are unique
/// per kind, not globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Requirement,
    UseCase,
    UserStory,
}

impl ElementKind {
    pub const ALL: [ElementKind; 3] = [
        ElementKind::Requirement,
        ElementKind::UseCase,
        ElementKind::UserStory,
    ];

    /// The wire/database tag for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Requirement => "requisito",
            ElementKind::UseCase => "caso_uso",
            ElementKind::UserStory => "historia_usuario",
        }
    }

    /// Parses a wire tag. Unknown tags are rejected, not defaulted.
    #[must_use]
    pub fn parse(tag: &str) -> Option<ElementKind> {
        match tag {
            "requisito" => Some(ElementKind::Requirement),
            "caso_uso" => Some(ElementKind::UseCase),
            "historia_usuario" => Some(ElementKind::UserStory),
            _ => None,
        }
    }
}

/// The four name-plus-description lookup tables that share one CRUD shape.
///
/// Priorities, project statuses and element statuses carry extra columns and
/// get their own store methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    RequirementType,
    UseCaseRelationType,
    RequirementRelationType,
    EstimationType,
}

impl CatalogKind {
    /// Backing table name. Fixed set, safe to splice into SQL.
    #[must_use]
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::RequirementType => "tipos_requisito",
            CatalogKind::UseCaseRelationType => "tipos_relacion_cu",
            CatalogKind::RequirementRelationType => "tipos_relacion_requisito",
            CatalogKind::EstimationType => "tipos_estimacion",
        }
    }

    /// Human label used in API messages ("Tipo de requisito no encontrado").
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::RequirementType => "Tipo de requisito",
            CatalogKind::UseCaseRelationType => "Tipo de relación CU",
            CatalogKind::RequirementRelationType => "Tipo de relación requisito",
            CatalogKind::EstimationType => "Tipo de estimación",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_kind_round_trip() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_element_kind_rejects_unknown() {
        assert_eq!(ElementKind::parse("proyecto"), None);
        assert_eq!(ElementKind::parse(""), None);
    }

    #[test]
    fn test_catalog_tables_are_distinct() {
        let tables = [
            CatalogKind::RequirementType.table(),
            CatalogKind::UseCaseRelationType.table(),
            CatalogKind::RequirementRelationType.table(),
            CatalogKind::EstimationType.table(),
        ];
        for (i, a) in tables.iter().enumerate() {
            for b in &tables[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
