//! In-Memory Job Registry Implementation

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::application::ports::{Job, JobError, JobRegistryPort, JobStatus};
use crate::domain::book::{BookId, ChapterSummary};

/// 内存任务登记表
pub struct InMemoryJobRegistry {
    /// job_id -> Job
    jobs: DashMap<Uuid, Job>,
    /// 进行中任务占用的 book_id -> job_id
    reservations: DashMap<BookId, Uuid>,
    /// 任务队列发送端
    queue_sender: mpsc::Sender<Uuid>,
}

impl InMemoryJobRegistry {
    pub fn new(queue_sender: mpsc::Sender<Uuid>) -> Self {
        Self {
            jobs: DashMap::new(),
            reservations: DashMap::new(),
            queue_sender,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 周期性清理过期的终态任务，随进程运行
    pub async fn run_expiry_sweeper(self: Arc<Self>, ttl: Duration, every: Duration) {
        let ttl = match chrono::Duration::from_std(ttl) {
            Ok(ttl) => ttl,
            Err(e) => {
                tracing::warn!(error = %e, "Job TTL out of range, expiry disabled");
                return;
            }
        };

        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.evict_expired(ttl);
        }
    }

    fn release(&self, book_id: &BookId, job_id: Uuid) {
        self.reservations.remove_if(book_id, |_, owner| *owner == job_id);
    }

    fn update<F>(&self, job_id: Uuid, f: F) -> Result<(), JobError>
    where
        F: FnOnce(&mut Job) -> Result<(), JobError>,
    {
        let mut job = self.jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;
        f(&mut job)?;
        job.updated_at = Utc::now();
        Ok(())
    }

    /// 删除满足条件的终态任务
    fn remove_terminal_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Job) -> bool,
    {
        let mut removed = 0;
        self.jobs.retain(|_, job| {
            let evict = job.status.is_terminal() && predicate(job);
            if evict {
                removed += 1;
            }
            !evict
        });
        removed
    }
}

impl JobRegistryPort for InMemoryJobRegistry {
    fn submit(&self, job: Job) -> Result<Uuid, JobError> {
        let job_id = job.job_id;
        let book_id = job.book_id.clone();

        match self.reservations.entry(book_id.clone()) {
            Entry::Occupied(_) => return Err(JobError::AlreadyExists(book_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(job_id);
            }
        }

        self.jobs.insert(job_id, job);

        // 发送到队列
        if let Err(e) = self.queue_sender.try_send(job_id) {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to enqueue job");
            self.jobs.remove(&job_id);
            self.release(&book_id, job_id);
            return Err(JobError::QueueFull);
        }

        tracing::debug!(job_id = %job_id, book_id = %book_id, "Job registered");
        Ok(job_id)
    }

    fn get(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.get(&job_id).map(|j| j.clone())
    }

    fn transition(&self, job_id: Uuid, status: JobStatus) -> Result<(), JobError> {
        let mut released = None;
        self.update(job_id, |job| {
            if !job.status.can_transition_to(status) {
                return Err(JobError::InvalidTransition {
                    from: job.status.to_string(),
                    to: status.to_string(),
                });
            }
            tracing::debug!(
                job_id = %job_id,
                old_status = %job.status,
                new_status = %status,
                "Job status changed"
            );
            job.status = status;
            if status.is_terminal() {
                released = Some(job.book_id.clone());
            }
            Ok(())
        })?;

        if let Some(book_id) = released {
            self.release(&book_id, job_id);
        }
        Ok(())
    }

    fn fail(&self, job_id: Uuid, error: String) -> Result<(), JobError> {
        let mut released = None;
        self.update(job_id, |job| {
            if !job.status.can_transition_to(JobStatus::Failed) {
                return Err(JobError::InvalidTransition {
                    from: job.status.to_string(),
                    to: JobStatus::Failed.to_string(),
                });
            }
            job.status = JobStatus::Failed;
            job.error = Some(error);
            released = Some(job.book_id.clone());
            Ok(())
        })?;

        if let Some(book_id) = released {
            self.release(&book_id, job_id);
        }
        Ok(())
    }

    fn set_chapters(&self, job_id: Uuid, chapters: Vec<ChapterSummary>) -> Result<(), JobError> {
        self.update(job_id, |job| {
            job.chapters = chapters;
            Ok(())
        })
    }

    fn update_chapter(&self, job_id: Uuid, chapter: ChapterSummary) -> Result<(), JobError> {
        self.update(job_id, |job| {
            match job.chapters.iter_mut().find(|c| c.index == chapter.index) {
                Some(slot) => *slot = chapter,
                None => job.chapters.push(chapter),
            }
            Ok(())
        })
    }

    fn is_book_id_reserved(&self, book_id: &BookId) -> bool {
        self.reservations.contains_key(book_id)
    }

    fn remove_by_book(&self, book_id: &BookId) -> usize {
        let removed = self.remove_terminal_where(|job| job.book_id == *book_id);
        if removed > 0 {
            tracing::debug!(book_id = %book_id, removed, "Book jobs cleaned up");
        }
        removed
    }

    fn evict_expired(&self, ttl: chrono::Duration) -> usize {
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return 0;
        };
        let removed = self.remove_terminal_where(|job| job.updated_at < cutoff);
        if removed > 0 {
            tracing::info!(removed, remaining = self.jobs.len(), "Expired jobs evicted");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{AlignmentSelection, JobRequest};
    use crate::domain::book::{ChapterRange, ChapterStatus};

    fn job(book_id: &str) -> Job {
        Job::new(
            BookId::parse(book_id).unwrap(),
            JobRequest {
                source_path: "/tmp/source.txt".into(),
                original_filename: "source.txt".into(),
                voice: "af_heart".into(),
                device: None,
                alignment: AlignmentSelection::Auto,
                range: ChapterRange::full(),
            },
        )
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let (tx, mut rx) = mpsc::channel(8);
        let registry = InMemoryJobRegistry::new(tx);

        let job_id = registry.submit(job("book")).unwrap();
        assert_eq!(rx.try_recv().unwrap(), job_id);
        assert!(registry.is_book_id_reserved(&BookId::parse("book").unwrap()));

        registry.transition(job_id, JobStatus::Splitting).unwrap();
        registry
            .set_chapters(job_id, vec![ChapterSummary::pending(1, "One")])
            .unwrap();
        registry.transition(job_id, JobStatus::Synthesizing(1)).unwrap();

        let mut chapter = ChapterSummary::pending(1, "One");
        chapter.mark_processing();
        registry.update_chapter(job_id, chapter).unwrap();

        // 不允许回退
        assert!(matches!(
            registry.transition(job_id, JobStatus::Splitting),
            Err(JobError::InvalidTransition { .. })
        ));

        registry.transition(job_id, JobStatus::Completed).unwrap();
        let snapshot = registry.get(job_id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.chapters[0].status, ChapterStatus::Processing);
        assert!(!registry.is_book_id_reserved(&snapshot.book_id));
    }

    #[tokio::test]
    async fn test_reservation_is_exclusive() {
        let (tx, _rx) = mpsc::channel(8);
        let registry = InMemoryJobRegistry::new(tx);

        let first = registry.submit(job("dup")).unwrap();
        assert!(matches!(registry.submit(job("dup")), Err(JobError::AlreadyExists(_))));

        registry.fail(first, "boom".into()).unwrap();
        assert_eq!(registry.get(first).unwrap().error.as_deref(), Some("boom"));
        assert!(registry.submit(job("dup")).is_ok());
        assert!(registry.fail(first, "again".into()).is_err());
    }

    #[tokio::test]
    async fn test_full_queue_rolls_back() {
        let (tx, _rx) = mpsc::channel(1);
        let registry = InMemoryJobRegistry::new(tx);

        registry.submit(job("a")).unwrap();
        assert!(matches!(registry.submit(job("b")), Err(JobError::QueueFull)));
        assert!(!registry.is_book_id_reserved(&BookId::parse("b").unwrap()));
    }

    #[tokio::test]
    async fn test_remove_by_book_keeps_running_jobs() {
        let (tx, _rx) = mpsc::channel(8);
        let registry = InMemoryJobRegistry::new(tx);

        let done = registry.submit(job("gone")).unwrap();
        registry.transition(done, JobStatus::Completed).unwrap();
        let running = registry.submit(job("gone")).unwrap();
        let other = registry.submit(job("other")).unwrap();
        registry.fail(other, "boom".into()).unwrap();

        assert_eq!(registry.remove_by_book(&BookId::parse("gone").unwrap()), 1);
        assert!(registry.get(done).is_none());
        assert!(registry.get(running).is_some());
        assert!(registry.get(other).is_some());
    }

    #[tokio::test]
    async fn test_evict_expired_terminal_jobs() {
        let (tx, _rx) = mpsc::channel(8);
        let registry = InMemoryJobRegistry::new(tx);

        let old = registry.submit(job("old")).unwrap();
        registry.transition(old, JobStatus::Completed).unwrap();
        let fresh = registry.submit(job("fresh")).unwrap();
        registry.fail(fresh, "boom".into()).unwrap();
        let stale_running = registry.submit(job("busy")).unwrap();

        let two_days_ago = Utc::now() - chrono::Duration::days(2);
        for id in [old, stale_running] {
            registry.jobs.get_mut(&id).unwrap().updated_at = two_days_ago;
        }

        assert_eq!(registry.evict_expired(chrono::Duration::days(1)), 1);
        assert!(registry.get(old).is_none());
        assert!(registry.get(fresh).is_some());
        assert!(registry.get(stale_running).is_some());
    }

    #[tokio::test]
    async fn test_expiry_sweeper_runs_periodically() {
        let (tx, _rx) = mpsc::channel(8);
        let registry = InMemoryJobRegistry::new(tx).arc();

        let job_id = registry.submit(job("swept")).unwrap();
        registry.transition(job_id, JobStatus::Completed).unwrap();
        registry.jobs.get_mut(&job_id).unwrap().updated_at = Utc::now() - chrono::Duration::hours(2);

        let sweeper = tokio::spawn(
            registry
                .clone()
                .run_expiry_sweeper(Duration::from_secs(3600), Duration::from_millis(10)),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.abort();

        assert!(registry.get(job_id).is_none());
    }
}
