use crate::domain::deliverable::{Deliverable, ReleaseModel};
use crate::domain::series::INDEPENDENT;
use crate::error::Result;
use crate::validate::context::ValidationContext;

const VALID_TYPES: &[&str] = &[
    "service",
    "library",
    "client-library",
    "horizon-plugin",
    "tempest-plugin",
    "other",
];

const VALID_LINK_MODES: &[&str] = &["tarball", "none"];

pub fn clone_deliverable(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    for repo in deliv.repos() {
        if repo.is_retired() {
            tracing::info!("{} is retired, skipping clone", repo.name);
            continue;
        }
        let cloned = ctx.git().checkout_ref(&repo.name, "master");
        if let Err(e) = cloned {
            ctx.error(format!("could not clone {}: {}", repo.name, e));
        }
    }
    Ok(())
}

pub fn validate_team(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let team = match deliv.team() {
        Some(team) => team,
        None => {
            ctx.error("no team specified");
            return Ok(());
        }
    };

    match ctx.governance().resolve_team(team) {
        Ok(Some(info)) => tracing::info!("owned by team {}", info.name),
        Ok(None) => ctx.warning(format!("Team {:?} not in governance data", team)),
        Err(e) => ctx.warning(format!("could not verify team {:?}: {}", team, e)),
    }
    Ok(())
}

pub fn validate_model(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    tracing::debug!("release model {}", deliv.model());

    if !deliv.is_independent() && deliv.declared_model().is_none() {
        ctx.error("no release-model specified");
    }

    if deliv.declared_model() == Some("independent") && !deliv.is_independent() {
        ctx.error(
            "uses the independent release model and should be in the _independent directory",
        );
    }

    // the effective model is always independent there, so look at the raw value
    let declared = deliv.declared_model().unwrap_or(INDEPENDENT);
    if deliv.is_independent() && declared != INDEPENDENT && declared != "abandoned" {
        ctx.error(
            "deliverables in the _independent directory should all use the independent release model",
        );
    }

    if let ReleaseModel::Unknown(other) = deliv.model() {
        ctx.error(format!("unknown release-model {:?}", other));
    }

    if !deliv.is_releasable() && deliv.is_released() {
        ctx.error("untagged deliverables should not have a \"releases\" section");
    }
    Ok(())
}

pub fn validate_type(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    if let Some(declared) = deliv.data().deliverable_type.as_deref() {
        if !VALID_TYPES.contains(&declared) {
            ctx.error(format!(
                "unknown deliverable type {:?}, expected one of {}",
                declared,
                VALID_TYPES.join(", ")
            ));
        }
    }

    let link_mode = deliv.artifact_link_mode();
    if !VALID_LINK_MODES.contains(&link_mode) {
        ctx.error(format!(
            "unknown artifact-link-mode {:?}, expected one of {}",
            link_mode,
            VALID_LINK_MODES.join(", ")
        ));
    }
    Ok(())
}
