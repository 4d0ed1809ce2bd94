//! Folding contributions into one synthetic type.
//!
//! Contributions are applied in provider-chain order. Each sees everything
//! applied before it, user members always win, and two generated
//! declarations of one signature must agree.

use std::collections::HashSet;

use crate::error::Error;
use crate::itd::builder::Contribution;
use crate::metadata::id::MetadataId;
use crate::model::java_type::JavaType;
use crate::model::member::DeclaredMember;
use crate::model::type_details::{
    ClassOrInterfaceTypeDetails, ClassOrInterfaceTypeDetailsBuilder, PhysicalTypeCategory,
};

/// The two views produced by assembling a governor's contributions.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// Generated members only, named after the artifact.
    pub itd: ClassOrInterfaceTypeDetails,
    /// Governor with every generated member folded in.
    pub merged: ClassOrInterfaceTypeDetails,
}

/// The governor plus `contributions`, without the separate ITD view.
/// Providers build against this so later links in the chain observe
/// earlier ones.
///
/// # Errors
///
/// `ConflictingContributions` when two contributions disagree on a member.
pub fn accumulated_view(
    governor: &ClassOrInterfaceTypeDetails,
    contributions: &[&Contribution],
) -> Result<ClassOrInterfaceTypeDetails, Error> {
    let mut merge = Merge::new(governor, None);
    for contribution in contributions {
        merge.apply(contribution)?;
    }
    return merge.merged.build();
}

/// Assemble the ITD for `governor`.
///
/// # Errors
///
/// `ConflictingContributions` when two contributions disagree on a member.
pub fn assemble(
    governor: &ClassOrInterfaceTypeDetails,
    companion_id: &MetadataId,
    artifact_type: &JavaType,
    contributions: &[&Contribution],
) -> Result<Assembly, Error> {
    let itd = ClassOrInterfaceTypeDetailsBuilder::new(
        companion_id.clone(),
        artifact_type.clone(),
        PhysicalTypeCategory::Class,
    );
    let mut merge = Merge::new(governor, Some(itd));
    for contribution in contributions {
        merge.apply(contribution)?;
    }
    let itd = match merge.itd {
        Some(itd) => itd.build()?,
        None => return Err(Error::IllegalArgument { reason: "assembly lost its ITD view".to_string() }),
    };
    return Ok(Assembly { itd, merged: merge.merged.build()? });
}

/// Working state of one assembly.
struct Merge {
    /// Generated members only; `None` when only the merged view is wanted.
    itd: Option<ClassOrInterfaceTypeDetailsBuilder>,
    /// Governor plus generated members.
    merged: ClassOrInterfaceTypeDetailsBuilder,
    /// Annotation types written by the user; never modified.
    user_annotations: HashSet<JavaType>,
}

impl Merge {
    /// Start from the governor.
    fn new(governor: &ClassOrInterfaceTypeDetails, itd: Option<ClassOrInterfaceTypeDetailsBuilder>) -> Self {
        return Self {
            itd,
            merged: ClassOrInterfaceTypeDetailsBuilder::from_existing(governor),
            user_annotations: governor.annotations().iter().map(|a| return a.annotation_type().clone()).collect(),
        };
    }

    /// Fold one contribution in.
    fn apply(&mut self, contribution: &Contribution) -> Result<(), Error> {
        let governor = contribution.governor.to_string();

        for field in &contribution.fields {
            let existing = self.merged.fields().iter().find(|f| return f.field_name() == field.field_name());
            if let Some(existing) = existing {
                check_agreement(&governor, existing, field, existing.field_type(), field.field_type())?;
                continue;
            }
            self.merged.add_field(field.clone());
            if let Some(itd) = self.itd.as_mut() {
                itd.add_field(field.clone());
            }
        }

        for method in &contribution.methods {
            let signature = method.signature();
            let existing = self.merged.methods().iter().find(|m| return m.signature() == signature);
            if let Some(existing) = existing {
                check_agreement(&governor, existing, method, existing.return_type(), method.return_type())?;
                continue;
            }
            self.merged.add_method(method.clone());
            if let Some(itd) = self.itd.as_mut() {
                itd.add_method(method.clone());
            }
        }

        for constructor in &contribution.constructors {
            let signature = constructor.signature();
            if self.merged.constructors().iter().any(|c| return c.signature() == signature) {
                continue;
            }
            self.merged.add_constructor(constructor.clone());
            if let Some(itd) = self.itd.as_mut() {
                itd.add_constructor(constructor.clone());
            }
        }

        for annotation in &contribution.annotations {
            if self.merged.add_annotation(annotation.clone()) {
                if let Some(itd) = self.itd.as_mut() {
                    itd.add_annotation(annotation.clone());
                }
            }
        }

        let user_annotations = &self.user_annotations;
        let is_generated = |existing: &crate::model::annotation::AnnotationMetadata| {
            return !user_annotations.contains(existing.annotation_type());
        };
        for update in &contribution.annotation_updates {
            if self.merged.update_annotation(update, &is_generated) {
                if let Some(itd) = self.itd.as_mut() {
                    itd.update_annotation(update, &|_| return true);
                }
            } else if user_annotations.contains(update.annotation_type()) {
                tracing::debug!(%governor, annotation = %update.annotation_type(), "user annotation left unchanged");
            }
        }

        self.merged.custom_data_mut().extend(&contribution.custom_data);
        if let Some(itd) = self.itd.as_mut() {
            itd.custom_data_mut().extend(&contribution.custom_data);
        }
        return Ok(());
    }
}

/// A member contributed again must be the user's (who wins) or agree in
/// type with the earlier generated declaration.
fn check_agreement(
    governor: &str,
    existing: &dyn DeclaredMember,
    incoming: &dyn DeclaredMember,
    existing_type: &JavaType,
    incoming_type: &JavaType,
) -> Result<(), Error> {
    if existing.is_user_declared() {
        tracing::debug!(%governor, member = %incoming.signature(), "user member wins");
        return Ok(());
    }
    if existing_type.erasure() == incoming_type.erasure() {
        return Ok(());
    }
    return Err(Error::ConflictingContributions {
        first: existing.declared_by().to_string(),
        governor: governor.to_string(),
        member: incoming.signature().to_string(),
        reason: format!("{existing_type} vs {incoming_type}"),
        second: incoming.declared_by().to_string(),
    });
}
