//! Reconciliation driver
//!
//! [`reconcile`] runs the read → create / update cycle for one resource.
//! [`execute`] runs it for a list of resources, sequentially and in the
//! order given.

use crate::context::{ConfirmCallback, HandlerContext, ProgressCallback};
use crate::resource::{Handler, Resource};
use crate::types::{ApplyResult, ExecuteSummary, ReconcileOptions};

/// Reconcile a single resource
///
/// 1. `read` the observed state
/// 2. absent: `create`
/// 3. present with changes: `update`
///
/// Any handler error marks the context as failed and stops the call. In
/// dry-run mode the cycle stops after `read`.
pub fn reconcile<R, H>(
    handler: &H,
    resource: &R,
    ctx: &mut HandlerContext,
    opts: &ReconcileOptions,
) -> ApplyResult
where
    R: ?Sized,
    H: Handler<R> + ?Sized,
{
    if let Err(e) = handler.read(resource, ctx) {
        ctx.fail(e);
    }
    if ctx.failed {
        return failed(ctx);
    }

    if !ctx.deployed {
        if opts.dry_run {
            return ApplyResult::Skipped {
                reason: "absent (dry run)".to_string(),
            };
        }

        if let Err(e) = handler.create(resource, ctx) {
            ctx.fail(e);
        }
        if ctx.failed {
            return failed(ctx);
        }
        if ctx.deployed {
            return ApplyResult::Created;
        }
        return ApplyResult::Skipped {
            reason: last_warning(ctx).unwrap_or_else(|| "not created".to_string()),
        };
    }

    if ctx.changes.is_empty() {
        return ApplyResult::NoChange;
    }

    if opts.dry_run {
        return ApplyResult::Drifted {
            changes: ctx.changes.clone(),
        };
    }

    if let Err(e) = handler.update(resource, ctx) {
        ctx.fail(e);
    }
    if ctx.failed {
        return failed(ctx);
    }
    ApplyResult::Modified
}

/// Reconcile a list of resources with the given options and callbacks
///
/// A read-only pass runs first. When it finds nothing to do, or the user
/// declines, no remote mutation is attempted.
pub fn execute<R, H, P, C>(
    resources: &[R],
    handler: &H,
    opts: &ReconcileOptions,
    progress: &mut P,
    confirm: &mut C,
) -> anyhow::Result<ExecuteSummary>
where
    R: Resource,
    H: Handler<R> + ?Sized,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let check = ReconcileOptions { dry_run: true };
    let mut preview = ExecuteSummary::default();
    for resource in resources {
        let mut ctx = HandlerContext::new(resource.task_id());
        let result = reconcile(handler, resource, &mut ctx, &check);
        preview.add_result(&result);
        if opts.dry_run {
            progress.on_resource_complete(&resource.id(), &result, &ctx);
        }
    }

    let pending = preview.drifted + preview.skipped;
    if opts.dry_run || pending == 0 {
        return Ok(preview);
    }

    if !confirm.confirm(&format!("Apply changes to {} resource(s)?", pending))? {
        return Ok(ExecuteSummary {
            skipped: pending,
            no_change: preview.no_change,
            failed: preview.failed,
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary::default();
    for resource in resources {
        progress.on_resource_start(&resource.id(), &resource.description());
        let mut ctx = HandlerContext::new(resource.task_id());
        let result = reconcile(handler, resource, &mut ctx, opts);
        progress.on_resource_complete(&resource.id(), &result, &ctx);
        summary.add_result(&result);
    }

    Ok(summary)
}

fn failed(ctx: &HandlerContext) -> ApplyResult {
    let error = match &ctx.fault {
        Some(fault) => format!("{:#}", fault),
        None => last_error(ctx).unwrap_or_else(|| "failed".to_string()),
    };
    ApplyResult::Failed { error }
}

fn last_error(ctx: &HandlerContext) -> Option<String> {
    ctx.messages(crate::context::Level::Error)
        .last()
        .map(str::to_string)
}

fn last_warning(ctx: &HandlerContext) -> Option<String> {
    ctx.messages(crate::context::Level::Warn)
        .last()
        .map(str::to_string)
}
