//! Plural names of types, e.g. `Person` → `People` via `@Plural`, or
//! `Category` → `Categories` by inflection.

use crate::error::Error;
use crate::metadata::dependency::DependencyRegistry;
use crate::metadata::id::{MetadataId, ProviderKind};
use crate::metadata::item::{MetadataBody, MetadataItem};
use crate::metadata::provider::{self, MetadataProvider};
use crate::metadata::service::MetadataService;
use crate::model::annotation::AnnotationValue;
use crate::model::java_type::JavaType;
use crate::providers::{self, PLURAL_ANNOTATION};

/// Upstream kinds.
const UPSTREAMS: [ProviderKind; 1] = [ProviderKind::PHYSICAL_TYPE];

/// Serves `MID#plural` items.
#[derive(Debug, Default)]
pub struct PluralProvider;

impl MetadataProvider for PluralProvider {
    fn kind(&self) -> ProviderKind {
        return ProviderKind::PLURAL;
    }

    fn get_metadata(&self, id: &MetadataId, service: &MetadataService) -> Result<Option<MetadataItem>, Error> {
        provider::ensure_owned(self.kind(), id)?;
        let Some(governor) = providers::physical_details(service, id)? else {
            return Ok(None);
        };
        let explicit = governor
            .annotation(&JavaType::new(PLURAL_ANNOTATION))
            .and_then(|a| return a.attribute("value"))
            .and_then(AnnotationValue::as_str)
            .filter(|p| return !p.trim().is_empty());
        let plural = explicit.map_or_else(|| return pluralize(governor.name().simple_type_name()), str::to_string);
        return Ok(Some(MetadataItem::new(id.clone(), MetadataBody::Plural(plural))));
    }

    fn start(&self, registry: &DependencyRegistry) -> Result<(), Error> {
        return providers::register_class_edges(registry, &UPSTREAMS, self.kind());
    }

    fn stop(&self, registry: &DependencyRegistry) {
        providers::deregister_class_edges(registry, &UPSTREAMS, self.kind());
    }
}

/// English plural of a simple name.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last().map(|c| return c.to_ascii_lowercase());
        if before.is_some_and(|c| return !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| return lower.ends_with(suffix)) {
        return format!("{word}es");
    }
    return format!("{word}s");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflects_common_endings() {
        assert_eq!(pluralize("Foo"), "Foos");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Day"), "Days");
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("Match"), "Matches");
    }
}
