//! The top level sequences: development, production, linting and the accessibility scan.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use crate::{
    error::Result,
    graph::TaskGraph,
    server,
    tasks::{self, Context, TaskId},
    watch,
};

pub fn dev_graph() -> TaskGraph {
    TaskGraph::stages(&[
        &[TaskId::Clean],
        &[
            TaskId::CopyFonts,
            TaskId::CopyVendorScripts,
            TaskId::CopyVendorStyles,
            TaskId::CopyImages,
        ],
        &[TaskId::CompileHtml],
        &[TaskId::CompileScripts],
        &[TaskId::ResetTemplates],
        &[TaskId::PrettifyHtml],
        &[TaskId::CompileStyles],
    ])
}

/// `docs` adds the publish-ready copy of the output tree as the last step
pub fn prod_graph(docs: bool) -> TaskGraph {
    let mut graph = TaskGraph::stages(&[
        &[TaskId::Clean],
        &[TaskId::CompileStyles],
        &[TaskId::CopyFonts, TaskId::CopyImages],
        &[TaskId::CompileHtml],
        &[TaskId::ConcatScripts],
        &[TaskId::MinifyScripts],
        &[TaskId::MinifyStyles],
        &[TaskId::RewriteReferences],
        &[TaskId::PrettifyHtml],
    ]);
    if docs {
        graph.add_dependency(TaskId::PrettifyHtml, TaskId::PublishDocs);
    }
    graph
}

pub fn lint_graph() -> TaskGraph {
    TaskGraph::stages(&[&[TaskId::LintHtml], &[TaskId::LintStyles], &[TaskId::LintScripts]])
}

pub async fn run_graph(ctx: &Arc<Context>, graph: &TaskGraph) -> Result<()> {
    let ctx = Arc::clone(ctx);
    graph
        .run(Arc::new(move |task: TaskId| tasks::run(&ctx, task)))
        .await
}

/// Run every linter and return how many findings they reported.
pub async fn linters(ctx: &Arc<Context>) -> Result<usize> {
    if !ctx.layout.output.exists() {
        log::warn!(
            "`{}` does not exist, build the site before linting its pages",
            ctx.layout.output.display()
        );
    }
    run_graph(ctx, &lint_graph()).await?;
    Ok(ctx.findings().len())
}

pub async fn accessibility(ctx: &Arc<Context>) -> Result<()> {
    run_graph(ctx, &TaskGraph::stages(&[&[TaskId::Accessibility]])).await
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProdOptions {
    pub docs: bool,
    /// serve the result for a local preview
    pub serve: Option<SocketAddr>,
}

pub async fn prod(ctx: &Arc<Context>, options: ProdOptions) -> Result<()> {
    run_graph(ctx, &prod_graph(options.docs)).await?;
    log::info!("Production build written to `{}`", ctx.layout.output.display());
    match options.serve {
        Some(addr) => serve(ctx, addr).await,
        None => Ok(()),
    }
}

pub async fn serve(ctx: &Arc<Context>, addr: SocketAddr) -> Result<()> {
    let app = server::router(&ctx.layout.output, ctx.reload().clone());
    server::serve(app, addr).await
}

/// Build once, then serve with live reload while rebuilding whatever changes.
pub async fn dev(ctx: &Arc<Context>, addr: SocketAddr) -> Result<()> {
    run_graph(ctx, &dev_graph()).await?;

    let watched = Arc::clone(ctx);
    let debounce = Duration::from_millis(ctx.config.watch.debounce_ms);
    let watcher = tokio::task::spawn_blocking(move || {
        let layout = watched.layout.clone();
        watch::watch(&layout, debounce, |changed| {
            for &task in changed {
                if let Err(err) = tasks::run(&watched, task) {
                    log::error!("`{task}` failed: {err}");
                }
            }
        })
    });

    tokio::select! {
        served = serve(ctx, addr) => served,
        watched = watcher => match watched {
            Ok(result) => result,
            Err(err) => Err(io::Error::other(err).into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[TaskId], task: TaskId) -> usize {
        order.iter().position(|t| *t == task).unwrap()
    }

    #[test]
    fn dev_order() {
        let order = dev_graph().order().unwrap();
        assert_eq!(order[0], TaskId::Clean);
        assert!(position(&order, TaskId::CopyImages) < position(&order, TaskId::CompileHtml));
        assert!(position(&order, TaskId::CompileHtml) < position(&order, TaskId::CompileScripts));
        assert!(position(&order, TaskId::ResetTemplates) < position(&order, TaskId::PrettifyHtml));
        assert_eq!(order.last(), Some(&TaskId::CompileStyles));
    }

    #[test]
    fn prod_order_and_docs() {
        let order = prod_graph(false).order().unwrap();
        assert!(position(&order, TaskId::CompileStyles) < position(&order, TaskId::CompileHtml));
        assert!(position(&order, TaskId::ConcatScripts) < position(&order, TaskId::MinifyScripts));
        assert!(position(&order, TaskId::MinifyStyles) < position(&order, TaskId::RewriteReferences));
        assert_eq!(order.last(), Some(&TaskId::PrettifyHtml));
        assert!(!order.contains(&TaskId::PublishDocs));

        let order = prod_graph(true).order().unwrap();
        assert_eq!(order.last(), Some(&TaskId::PublishDocs));
    }

    #[test]
    fn linters_run_one_after_another() {
        assert_eq!(
            lint_graph().order().unwrap(),
            vec![TaskId::LintHtml, TaskId::LintStyles, TaskId::LintScripts]
        );
    }
}
