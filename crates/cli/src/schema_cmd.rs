use std::io::Write as _;

use anyhow::Result;

use atlas_core::{
    DevNormalizer, DiffEngine, InspectOptions, Inspector as _, Normalizer as _, Plan,
    PlanApplier as _, PlanOptions, Realm, apply_plan,
};

use crate::{SchemaCommand, TargetFlags, registry};

pub fn run(command: SchemaCommand) -> Result<()> {
    match command {
        SchemaCommand::Inspect(target) => inspect(&target),
        SchemaCommand::Diff { target, to, dev_url } => {
            let plan = diff_plan(&target, &to, dev_url.as_deref())?;
            print_plan(&plan);
            Ok(())
        }
        SchemaCommand::Apply {
            target,
            to,
            dev_url,
            dry_run,
            auto_approve,
        } => apply(&target, &to, dev_url.as_deref(), dry_run, auto_approve),
        SchemaCommand::Clean { target, auto_approve } => clean(&target, auto_approve),
    }
}

fn inspect(target: &TargetFlags) -> Result<()> {
    let (_, mut driver) = registry::open(&target.url)?;
    let realm = driver.inspect_realm(&InspectOptions::schemas(target.schemas.clone()))?;
    println!("{}", serde_json::to_string_pretty(&realm)?);
    Ok(())
}

fn diff_plan(target: &TargetFlags, to: &str, dev_url: Option<&str>) -> Result<Plan> {
    let opts = InspectOptions::schemas(target.schemas.clone());
    let (_, mut driver) = registry::open(&target.url)?;
    let current = driver.inspect_realm(&opts)?;

    let (_, mut desired_driver) = registry::open(to)?;
    let mut desired = desired_driver.inspect_realm(&opts)?;

    // Normalization keeps presentation-only differences in the desired
    // state from surfacing as changes.
    if let Some(dev_url) = dev_url {
        let (_, mut dev) = registry::open(dev_url)?;
        desired = DevNormalizer::new(dev.as_mut()).normalize_realm(&desired)?;
    }

    let engine = DiffEngine::new(driver.diff_hooks());
    let changes = engine.realm_diff(&current, &desired)?;
    Ok(driver.plan_changes("schema apply", &changes, &PlanOptions::default())?)
}

fn apply(
    target: &TargetFlags,
    to: &str,
    dev_url: Option<&str>,
    dry_run: bool,
    auto_approve: bool,
) -> Result<()> {
    let plan = diff_plan(target, to, dev_url)?;
    if plan.changes.is_empty() {
        println!("Schema is synced, no changes to be made.");
        return Ok(());
    }
    print_plan(&plan);
    if dry_run {
        return Ok(());
    }
    if !auto_approve && !confirm()? {
        println!("Aborted.");
        return Ok(());
    }

    let (_, mut driver) = registry::open(&target.url)?;
    apply_plan(driver.as_mut(), &plan, None)?;
    println!("Applied {} statement(s).", plan.changes.len());
    Ok(())
}

fn clean(target: &TargetFlags, auto_approve: bool) -> Result<()> {
    let opts = InspectOptions::schemas(target.schemas.clone());
    let (_, mut driver) = registry::open(&target.url)?;
    let current = driver.inspect_realm(&opts)?;

    // The desired state keeps the schemas but none of their contents.
    let desired = Realm {
        schemas: current
            .schemas
            .iter()
            .map(|s| atlas_core::Schema::new(&s.name))
            .collect(),
        attrs: current.attrs.clone(),
    };
    let engine = DiffEngine::new(driver.diff_hooks());
    let changes = engine.realm_diff(&current, &desired)?;
    if changes.is_empty() {
        println!("Nothing to clean.");
        return Ok(());
    }
    let plan = driver.plan_changes("schema clean", &changes, &PlanOptions::default())?;
    print_plan(&plan);
    if !auto_approve && !confirm()? {
        println!("Aborted.");
        return Ok(());
    }
    apply_plan(driver.as_mut(), &plan, None)?;
    println!("Cleaned {} object(s).", plan.changes.len());
    Ok(())
}

pub fn print_plan(plan: &Plan) {
    for change in &plan.changes {
        println!("-- {}", change.comment);
        println!("{};", change.cmd);
    }
    if !plan.reversible {
        println!("-- plan is not reversible");
    }
    if !plan.transactional {
        println!("-- plan runs outside a transaction");
    }
}

fn confirm() -> Result<bool> {
    print!("Apply? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
