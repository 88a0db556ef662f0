use crate::errors::RegistryError;
use crate::inventory::{Inventory, KeepReason};
use crate::progress::ProgressObserver;
use crate::registry::{InteractWithRegistry, RegistryClient};
use std::sync::Arc;
use tokio::sync::mpsc;

const MAX_CRAWL_WORKERS: usize = 40;
const MAX_REPO_DELETE_WORKERS: usize = 8;
const MAX_IMAGE_DELETE_WORKERS: usize = 8;

/// Crawls the whole registry: lists every repository, then fans out a
/// bounded pool of up to `min(40, repo_count)` workers to describe each
/// one concurrently. The main task submits every job up front and reads
/// back exactly `repo_count` results, which is what guarantees crawl
/// completeness regardless of worker scheduling order.
pub async fn crawl(registry: Arc<RegistryClient>) -> Result<Inventory, RegistryError> {
    let repo_paths = registry.list_repositories().await?;
    let repo_count = repo_paths.len();
    if repo_count == 0 {
        return Ok(Vec::new());
    }

    let worker_count = MAX_CRAWL_WORKERS.min(repo_count);
    let (jobs_tx, jobs_rx) = async_channel::bounded(repo_count);
    let (results_tx, mut results_rx) = mpsc::channel(repo_count);

    for path in repo_paths {
        jobs_tx.send(path).await.expect("jobs channel has capacity for every repo");
    }
    jobs_tx.close();

    let mut workers = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let jobs_rx = jobs_rx.clone();
        let results_tx = results_tx.clone();
        let registry = registry.clone();
        workers.push(tokio::spawn(async move {
            while let Ok(path) = jobs_rx.recv().await {
                let result = registry.describe_repository(&path).await;
                if results_tx.send(result).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(results_tx);

    let mut inventory = Vec::with_capacity(repo_count);
    for _ in 0..repo_count {
        let repository = results_rx.recv().await.expect("exactly repo_count results are produced")?;
        inventory.push(repository);
    }

    for worker in workers {
        let _ = worker.await;
    }

    Ok(inventory)
}

/// Per-repository accounting returned by `delete_unkept_images`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteTally {
    pub should_delete: u64,
    pub managed_to_delete: u64,
}

/// Deletes every image with keep-reason `None` across the inventory, using
/// two nested bounded pools: up to 8 repository workers, each spawning up
/// to 8 image workers. This caps in-flight delete sequences at 64, since
/// each delete is itself a multi-request (tags, then manifest) sequence.
pub async fn delete_unkept_images(
    registry: Arc<RegistryClient>,
    inventory: &Inventory,
    progress: Arc<dyn ProgressObserver>,
) -> DeleteTally {
    let total_to_delete: u64 = inventory.iter().map(|r| r.should_delete_count() as u64).sum();
    progress.started(total_to_delete);

    let repo_worker_count = MAX_REPO_DELETE_WORKERS.min(inventory.len().max(1));
    let (jobs_tx, jobs_rx) = async_channel::bounded(inventory.len().max(1));
    for repository in inventory {
        jobs_tx.send(repository.clone()).await.expect("jobs channel sized to inventory length");
    }
    jobs_tx.close();

    let (tally_tx, mut tally_rx) = mpsc::channel(inventory.len().max(1));

    let mut workers = Vec::with_capacity(repo_worker_count);
    for _ in 0..repo_worker_count {
        let jobs_rx = jobs_rx.clone();
        let tally_tx = tally_tx.clone();
        let registry = registry.clone();
        let progress = progress.clone();
        workers.push(async move {
            while let Ok(repository) = jobs_rx.recv().await {
                let tally = delete_one_repository(&registry, &repository, progress.as_ref()).await;
                if tally_tx.send(tally).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tally_tx);

    let joined = futures::future::join_all(workers);
    let expected = inventory.len();
    let collector = async {
        let mut total = DeleteTally::default();
        for _ in 0..expected {
            if let Some(tally) = tally_rx.recv().await {
                total.should_delete += tally.should_delete;
                total.managed_to_delete += tally.managed_to_delete;
            }
        }
        total
    };

    let (_, total) = tokio::join!(joined, collector);
    progress.finished();
    total
}

async fn delete_one_repository(
    registry: &RegistryClient,
    repository: &crate::inventory::Repository,
    progress: &dyn ProgressObserver,
) -> DeleteTally {
    let candidates: Vec<_> = repository
        .images
        .iter()
        .filter(|i| i.kept_data.reason == KeepReason::None)
        .cloned()
        .collect();

    let should_delete = candidates.len() as u64;
    if candidates.is_empty() {
        return DeleteTally::default();
    }

    let worker_count = MAX_IMAGE_DELETE_WORKERS.min(candidates.len());
    let (jobs_tx, jobs_rx) = async_channel::bounded(candidates.len());
    for image in candidates {
        jobs_tx.send(image).await.expect("jobs channel sized to candidate count");
    }
    jobs_tx.close();

    let (ok_tx, mut ok_rx) = mpsc::channel(worker_count.max(1));
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let jobs_rx = jobs_rx.clone();
        let ok_tx = ok_tx.clone();
        let repo_link = repository.link.clone();
        handles.push(async move {
            while let Ok(image) = jobs_rx.recv().await {
                let tags: Vec<String> = image.tags.iter().cloned().collect();
                let outcome = registry.delete_image(&repo_link, &tags, &image.digest).await;
                if outcome.is_err() {
                    tracing::warn!(repository = %repo_link, digest = %image.digest, "failed to delete image after retries");
                }
                if ok_tx.send(outcome.is_ok()).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(ok_tx);

    let joined = futures::future::join_all(handles);
    let expected = should_delete as usize;
    let collector = async {
        let mut managed = 0u64;
        for _ in 0..expected {
            if let Some(ok) = ok_rx.recv().await {
                if ok {
                    managed += 1;
                }
                progress.increment(1);
            }
        }
        managed
    };

    let (_, managed_to_delete) = tokio::join!(joined, collector);

    DeleteTally {
        should_delete,
        managed_to_delete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_worker_count_never_exceeds_the_ceiling_or_the_repo_count() {
        assert_eq!(MAX_CRAWL_WORKERS.min(5), 5);
        assert_eq!(MAX_CRAWL_WORKERS.min(500), MAX_CRAWL_WORKERS);
    }

    #[test]
    fn delete_worker_ceiling_matches_the_documented_bound() {
        assert_eq!(MAX_REPO_DELETE_WORKERS * MAX_IMAGE_DELETE_WORKERS, 64);
    }

    #[test]
    fn tally_accumulates_across_repositories() {
        let a = DeleteTally {
            should_delete: 3,
            managed_to_delete: 2,
        };
        let b = DeleteTally {
            should_delete: 1,
            managed_to_delete: 1,
        };
        let mut total = DeleteTally::default();
        for t in [a, b] {
            total.should_delete += t.should_delete;
            total.managed_to_delete += t.managed_to_delete;
        }
        assert_eq!(total.should_delete, 4);
        assert_eq!(total.managed_to_delete, 3);
    }
}
