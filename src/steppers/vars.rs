//! Vars stepper: variable writes, display, domain declarations and
//! ordered-domain arithmetic.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::scope::{Origin, WriteOutcome};
use crate::core::step_result::ActionResult;
use crate::core::world::World;
use crate::domain::{normalize_key, TermValue, DOMAIN_STRING};
use crate::error::{DomainError, StepError};
use crate::resolver::definition::{ResolveHook, StepDefinition};
use crate::resolver::{dequote, StepArgs};

use super::action::{StepAction, StepContext};
use super::Stepper;

fn split_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|v| dequote(v).to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Registers an enumerated domain while the declaring line resolves, so
/// later lines of the same pass can coerce against it. Re-declaring the
/// identical domain (shared background text) is a no-op.
struct DomainDeclHook {
    ordered: bool,
}

impl ResolveHook for DomainDeclHook {
    fn on_resolve(
        &self,
        captures: &HashMap<String, String>,
        _path: &str,
        _background: bool,
        world: &mut World,
    ) -> Result<(), StepError> {
        let name = captures
            .get("name")
            .ok_or_else(|| StepError::MissingArgument("name".to_string()))?;
        let raw_values = captures
            .get("values")
            .ok_or_else(|| StepError::MissingArgument("values".to_string()))?;
        let values = split_values(raw_values);
        if let Some(existing) = world.domains.get(name) {
            if existing.values() == Some(values.as_slice()) && existing.is_ordered() == self.ordered
            {
                return Ok(());
            }
            return Err(StepError::Domain(DomainError::Duplicate(normalize_key(
                name,
            ))));
        }
        world
            .domains
            .register_enum(name, values, self.ordered, None)?;
        Ok(())
    }
}

/// `set {what} to {value}`. An existing typed variable keeps its domain;
/// the incoming value is coerced into it, failure is a not-ok result.
struct SetAction;

#[async_trait]
impl StepAction for SetAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let what = args.raw("what")?.trim().to_string();
        let raw_value = args.raw("value")?;
        let existing_domain = ctx.world.scope.get(&what).map(|v| v.domain.clone());
        let (value, origin, domain) = ctx.world.value_of(raw_value);
        let (value, domain) = match existing_domain {
            Some(key) if key != DOMAIN_STRING => {
                match ctx.world.domains.coerce(&key, &value.to_display_string()) {
                    Ok(coerced) => (coerced, key),
                    Err(error) => return Ok(ActionResult::fail("set", error)),
                }
            }
            _ => (value, domain),
        };
        ctx.world
            .scope
            .set(&what, value, &domain, origin, &ctx.cause())?;
        Ok(ActionResult::ok_with("set", json!({ "what": what })))
    }
}

/// `set empty {what} to {value}`: only writes when unset.
struct SetEmptyAction;

#[async_trait]
impl StepAction for SetEmptyAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let what = args.raw("what")?.trim().to_string();
        let raw_value = args.raw("value")?;
        let (value, origin, domain) = ctx.world.value_of(raw_value);
        let outcome = ctx
            .world
            .scope
            .set_if_absent(&what, value, &domain, origin, &ctx.cause())?;
        let detail = match outcome {
            WriteOutcome::Written => json!({ "what": what }),
            WriteOutcome::Kept => json!({ "what": what, "did not overwrite": true }),
        };
        Ok(ActionResult::ok_with("set empty", detail))
    }
}

/// `display {what}`: logs "x is y".
struct DisplayAction;

#[async_trait]
impl StepAction for DisplayAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let what = args.raw("what")?.trim();
        let (value, ..) = ctx.world.value_of(what);
        let text = format!("{what} is {}", value.to_display_string());
        ctx.world.logger.info(&text);
        Ok(ActionResult::ok_with("display", json!({ "display": text })))
    }
}

/// `increment {what}`: step an ordered-domain variable to its successor,
/// clamped at the top value.
struct IncrementAction;

#[async_trait]
impl StepAction for IncrementAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let what = args.raw("what")?.trim().to_string();
        let var = ctx
            .world
            .scope
            .get(&what)
            .ok_or_else(|| StepError::VariableNotFound(what.clone()))?;
        let domain_key = var.domain.clone();
        let current = var.value.to_display_string();

        let Some(domain) = ctx.world.domains.get(&domain_key) else {
            return Ok(ActionResult::fail(
                "increment",
                DomainError::Unknown(domain_key),
            ));
        };
        let (Some(values), true) = (domain.values(), domain.is_ordered()) else {
            return Ok(ActionResult::fail(
                "increment",
                DomainError::Unordered(domain_key),
            ));
        };
        let Some(index) = values.iter().position(|v| *v == current) else {
            return Ok(ActionResult::fail(
                "increment",
                format!("'{current}' is not a value of domain '{domain_key}'"),
            ));
        };
        let next = values[(index + 1).min(values.len() - 1)].clone();

        ctx.world.scope.set(
            &what,
            TermValue::String(next.clone()),
            &domain_key,
            Origin::Defined,
            &ctx.cause(),
        )?;
        Ok(ActionResult::ok_with(
            "increment",
            json!({ "from": current, "to": next }),
        ))
    }
}

/// `check {what} is {value}`: compare under the variable's domain, falling
/// back to plain value equality for unordered domains.
struct CheckAction;

#[async_trait]
impl StepAction for CheckAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let what = args.raw("what")?.trim();
        let (actual, _, domain_key) = ctx.world.value_of(what);
        let (expected, ..) = ctx.world.value_of(args.raw("value")?);
        let expected = ctx
            .world
            .domains
            .coerce(&domain_key, &expected.to_display_string())
            .unwrap_or(expected);

        let equal = match ctx.world.domains.compare(&domain_key, &actual, &expected) {
            Ok(ordering) => ordering == Ordering::Equal,
            Err(DomainError::Unordered(_)) => actual == expected,
            Err(error) => return Ok(ActionResult::fail("check", error)),
        };
        if equal {
            Ok(ActionResult::ok_with(
                "check",
                json!({ "what": what, "value": actual.to_display_string() }),
            ))
        } else {
            Ok(ActionResult::fail_with(
                "check",
                format!(
                    "{what} is {}, expected {}",
                    actual.to_display_string(),
                    expected.to_display_string()
                ),
                json!({ "actual": actual.to_display_string() }),
            ))
        }
    }
}

/// `variable {name} is of domain {domain}`: re-types a variable, coercing
/// its current value into the target domain.
struct RetypeAction;

#[async_trait]
impl StepAction for RetypeAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let name = args.raw("name")?.trim().to_string();
        let domain_key = normalize_key(args.raw("domain")?);
        let var = ctx
            .world
            .scope
            .get(&name)
            .ok_or_else(|| StepError::VariableNotFound(name.clone()))?;
        let current = var.value.to_display_string();
        let origin = var.origin;
        match ctx.world.domains.coerce(&domain_key, &current) {
            Ok(value) => {
                ctx.world
                    .scope
                    .set(&name, value, &domain_key, origin, &ctx.cause())?;
                Ok(ActionResult::ok_with(
                    "variable domain",
                    json!({ "name": name, "domain": domain_key }),
                ))
            }
            Err(error) => Ok(ActionResult::fail("variable domain", error)),
        }
    }
}

/// Domain declarations are resolve-time registrations; running the line is
/// a no-op acknowledgement.
struct DomainDeclAction;

#[async_trait]
impl StepAction for DomainDeclAction {
    async fn run(
        &self,
        args: &StepArgs,
        _ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let name = args.raw("name")?.to_string();
        Ok(ActionResult::ok_with("domain", json!({ "name": name })))
    }
}

pub struct VarsStepper;

impl Stepper for VarsStepper {
    fn name(&self) -> &str {
        "vars"
    }

    fn steps(&self) -> Vec<StepDefinition> {
        vec![
            StepDefinition::gwta("set", "set {what} to {value}", Arc::new(SetAction)).exposed(),
            StepDefinition::gwta(
                "set empty",
                "set empty {what} to {value}",
                Arc::new(SetEmptyAction),
            )
            .precludes(&["set"])
            .exposed(),
            StepDefinition::gwta("display", "display {what}", Arc::new(DisplayAction)).exposed(),
            StepDefinition::gwta("increment", "increment {what}", Arc::new(IncrementAction))
                .exposed(),
            StepDefinition::gwta("check", "check {what} is {value}", Arc::new(CheckAction))
                .exposed(),
            StepDefinition::gwta(
                "ordered domain",
                "ordered domain {name} of {values}",
                Arc::new(DomainDeclAction),
            )
            .with_resolve_hook(Arc::new(DomainDeclHook { ordered: true }))
            .exposed(),
            StepDefinition::gwta(
                "domain",
                "domain {name} of {values}",
                Arc::new(DomainDeclAction),
            )
            .with_resolve_hook(Arc::new(DomainDeclHook { ordered: false }))
            .exposed(),
            StepDefinition::gwta(
                "variable domain",
                "variable {name} is of domain {domain}",
                Arc::new(RetypeAction),
            )
            .exposed(),
        ]
    }
}
