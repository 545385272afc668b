//! Task graph: nodes are tasks, an edge `a -> b` means `a` must finish before `b` starts.
//!
//! The scheduler starts every task whose predecessors are done, so independent tasks run
//! concurrently on the blocking pool while dependent ones wait their turn.

use std::{
    collections::HashMap,
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Instant,
};

use petgraph::{algo::toposort, graphmap::DiGraphMap, Direction};
use tokio::task::JoinSet;

use crate::{
    error::{Error, Result},
    tasks::TaskId,
};

#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    inner: DiGraphMap<TaskId, ()>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks in groups: every task of a group depends on every task of the group before it,
    /// tasks within a group are independent.
    pub fn stages(stages: &[&[TaskId]]) -> Self {
        let mut graph = Self::new();
        let mut previous: &[TaskId] = &[];
        for stage in stages {
            for &task in *stage {
                graph.add_task(task);
                for &before in previous {
                    graph.add_dependency(before, task);
                }
            }
            previous = *stage;
        }
        graph
    }

    pub fn add_task(&mut self, task: TaskId) {
        self.inner.add_node(task);
    }

    /// `after` may only start once `before` finished
    pub fn add_dependency(&mut self, before: TaskId, after: TaskId) {
        self.inner.add_edge(before, after, ());
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.inner.contains_node(task)
    }

    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// one valid sequential order
    pub fn order(&self) -> Result<Vec<TaskId>> {
        toposort(&self.inner, None).map_err(|cycle| Error::CycleError(cycle.node_id()))
    }

    /// Run every task. After the first failure no new task is started; the ones already
    /// running are waited for and the first error is returned.
    pub async fn run<F>(&self, runner: Arc<F>) -> Result<()>
    where
        F: Fn(TaskId) -> Result<()> + Send + Sync + 'static,
    {
        self.order()?;
        let mut waiting: HashMap<TaskId, usize> = self
            .inner
            .nodes()
            .map(|task| {
                let before = self.inner.neighbors_directed(task, Direction::Incoming).count();
                (task, before)
            })
            .collect();
        let mut ready: Vec<TaskId> = waiting
            .iter()
            .filter(|(_, before)| **before == 0)
            .map(|(task, _)| *task)
            .collect();
        ready.sort();

        let mut running = JoinSet::new();
        let mut failure: Option<Error> = None;
        loop {
            if failure.is_none() {
                for task in ready.drain(..) {
                    let runner = Arc::clone(&runner);
                    log::info!("Starting `{task}`");
                    running.spawn_blocking(move || {
                        let start = Instant::now();
                        let result = panic::catch_unwind(AssertUnwindSafe(|| (*runner)(task)))
                            .unwrap_or(Err(Error::TaskPanic(task)));
                        (task, start.elapsed(), result)
                    });
                }
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (task, elapsed, result) = match joined {
                Ok(done) => done,
                Err(err) => {
                    log::error!("Task could not be joined: {err}");
                    failure.get_or_insert(io::Error::other(err).into());
                    continue;
                }
            };
            match result {
                Ok(()) => {
                    log::info!("Finished `{task}` after {elapsed:.2?}");
                    for next in self.inner.neighbors_directed(task, Direction::Outgoing) {
                        if let Some(before) = waiting.get_mut(&next) {
                            *before -= 1;
                            if *before == 0 {
                                ready.push(next);
                            }
                        }
                    }
                    ready.sort();
                }
                Err(err) => {
                    log::error!("`{task}` failed after {elapsed:.2?}: {err}");
                    failure.get_or_insert(err);
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    fn recorder() -> (Arc<Mutex<Vec<TaskId>>>, impl Fn(TaskId) -> Result<()> + Send + Sync) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        (log, move |task: TaskId| {
            seen.lock().push(task);
            Ok(())
        })
    }

    #[tokio::test]
    async fn stages_run_in_order() {
        let graph = TaskGraph::stages(&[
            &[TaskId::Clean],
            &[TaskId::CopyFonts, TaskId::CopyImages],
            &[TaskId::CompileHtml],
        ]);
        let (log, runner) = recorder();
        graph.run(Arc::new(runner)).await.unwrap();
        let order = log.lock().clone();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], TaskId::Clean);
        assert_eq!(order[3], TaskId::CompileHtml);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn independent_tasks_overlap() {
        let graph = TaskGraph::stages(&[&[TaskId::CopyFonts, TaskId::CopyImages]]);
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let runner = move |_: TaskId| {
            counter.fetch_add(1, Ordering::SeqCst);
            let deadline = Instant::now() + Duration::from_secs(5);
            while counter.load(Ordering::SeqCst) < 2 {
                if Instant::now() > deadline {
                    return Err(Error::IOError(std::io::Error::other("ran alone")));
                }
                thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        };
        graph.run(Arc::new(runner)).await.unwrap();
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_stops_dependents() {
        let graph = TaskGraph::stages(&[&[TaskId::Clean], &[TaskId::CompileHtml]]);
        let ran = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&ran);
        let runner = move |task: TaskId| {
            seen.lock().push(task);
            match task {
                TaskId::Clean => Err(Error::PageError("x".into())),
                _ => Ok(()),
            }
        };
        let err = graph.run(Arc::new(runner)).await.unwrap_err();
        assert!(matches!(err, Error::PageError(_)));
        assert_eq!(*ran.lock(), vec![TaskId::Clean]);
    }

    #[tokio::test]
    async fn panics_become_errors() {
        let graph = TaskGraph::stages(&[&[TaskId::Accessibility]]);
        let err = graph
            .run(Arc::new(|_: TaskId| -> Result<()> { panic!("boom") }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TaskPanic(TaskId::Accessibility)));
    }

    #[tokio::test]
    async fn cycles_are_rejected() {
        let mut graph = TaskGraph::new();
        graph.add_dependency(TaskId::CompileHtml, TaskId::PrettifyHtml);
        graph.add_dependency(TaskId::PrettifyHtml, TaskId::CompileHtml);
        let (log, runner) = recorder();
        let err = graph.run(Arc::new(runner)).await.unwrap_err();
        assert!(matches!(err, Error::CycleError(_)));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn order_respects_edges() {
        let graph = TaskGraph::stages(&[
            &[TaskId::ConcatScripts],
            &[TaskId::MinifyScripts],
            &[TaskId::RewriteReferences],
        ]);
        assert_eq!(
            graph.order().unwrap(),
            vec![TaskId::ConcatScripts, TaskId::MinifyScripts, TaskId::RewriteReferences]
        );
        assert!(graph.contains(TaskId::MinifyScripts));
        assert_eq!(graph.len(), 3);
    }
}
