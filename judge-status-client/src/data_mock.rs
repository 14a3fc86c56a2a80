use crate::prelude::*;
use judge_status::{Actor, ActorInfo, JobId, RawSubmission, RemoteStatusGateway, SourceId, Target};
use std::sync::atomic::{AtomicUsize, Ordering};

fn yes() -> bool {
    true
}

/// The state reported by one poll.
#[derive(Debug, Deserialize)]
struct PollStep {
    /// Whether the submission is visible at all.
    #[serde(default = "yes")]
    visible: bool,
    #[serde(default)]
    status: String,
    passed: Option<u32>,
    elapsed_ms: Option<u64>,
    memory_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DataFile {
    profile: Option<ActorInfo>,
    #[serde(default)]
    history: Vec<RawSubmission>,
    latest: Option<RawSubmission>,
    #[serde(default)]
    poll: Vec<PollStep>,
}

impl DataFile {
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = util::load_file(path)?;
        toml::from_str(&content).map_err(Error::TOMLParseError)
    }
}

/// A judge replayed from `<handle>.toml` in a directory.  The last poll
/// step repeats forever.
pub struct MockDataSource {
    data: DataFile,
    polls: AtomicUsize,
}

impl MockDataSource {
    pub fn new<P: AsRef<Path>>(dir: P, actor: &Actor) -> Result<Self> {
        let f = dir.as_ref().join(actor.handle().to_owned() + ".toml");
        Ok(Self {
            data: DataFile::load(f)?,
            polls: AtomicUsize::new(0),
        })
    }
}

fn unreachable_profile(actor: &Actor) -> judge_status::Error {
    judge_status::Error::Network(format!("no profile for {}", actor.handle()))
}

#[async_trait::async_trait]
impl RemoteStatusGateway for MockDataSource {
    async fn list_submissions(
        &self,
        _actor: &Actor,
        target: &Target,
        limit: usize,
    ) -> judge_status::Result<Vec<RawSubmission>> {
        let r = target.reference();
        Ok(self
            .data
            .history
            .iter()
            .filter(|x| x.target_ref == r)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_actor_info(&self, actor: &Actor) -> judge_status::Result<ActorInfo> {
        self.data
            .profile
            .clone()
            .ok_or_else(|| unreachable_profile(actor))
    }

    async fn fetch_latest_submission(
        &self,
        _actor: &Actor,
        _target: &Target,
    ) -> judge_status::Result<Option<RawSubmission>> {
        Ok(self.data.latest.clone())
    }

    async fn fetch_by_job_id(
        &self,
        _source_id: SourceId,
        _actor: &Actor,
        id: JobId,
    ) -> judge_status::Result<Option<RawSubmission>> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        let step = match self.data.poll.get(n).or_else(|| self.data.poll.last()) {
            Some(x) => x,
            None => return Ok(None),
        };
        let latest = match &self.data.latest {
            Some(x) if x.id == id && step.visible => x,
            _ => return Ok(None),
        };
        debug!("mock poll {} of job {}: {:?}", n, id, step);
        Ok(Some(RawSubmission {
            status: step.status.clone(),
            passed: step.passed.or(latest.passed),
            elapsed_ms: step.elapsed_ms.or(latest.elapsed_ms),
            memory_bytes: step.memory_bytes.or(latest.memory_bytes),
            ..latest.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"
[profile]
handle = "alice"
rating = 1400

[[history]]
id = 12
target_ref = "1850A"
created_at = 1700000012
status = "OK"

[[history]]
id = 11
target_ref = "1850B"
created_at = 1700000011
status = "WRONG_ANSWER"

[latest]
id = 13
source_id = 1850
target_ref = "1850A"
created_at = 1700000013

[[poll]]
visible = false

[[poll]]
status = "TESTING"
passed = 2

[[poll]]
status = "OK"
passed = 7
"#;

    fn mock() -> (tempfile::TempDir, MockDataSource) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alice.toml"), DATA).unwrap();
        let m = MockDataSource::new(dir.path(), &Actor::new("alice")).unwrap();
        (dir, m)
    }

    #[async_std::test]
    async fn test_history_filtered_by_target() {
        let (_dir, m) = mock();
        let a = Actor::new("alice");
        let h = m
            .list_submissions(&a, &Target::new(1850, "A"), 1000)
            .await
            .unwrap();
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].id, 12);
        assert_eq!(m.fetch_actor_info(&a).await.unwrap().rating, Some(1400));
    }

    #[async_std::test]
    async fn test_poll_script() {
        let (_dir, m) = mock();
        let a = Actor::new("alice");
        assert_eq!(m.fetch_by_job_id(1850, &a, 13).await.unwrap(), None);
        let r = m.fetch_by_job_id(1850, &a, 13).await.unwrap().unwrap();
        assert_eq!((r.status.as_str(), r.passed), ("TESTING", Some(2)));
        for _ in 0..3 {
            let r = m.fetch_by_job_id(1850, &a, 13).await.unwrap().unwrap();
            assert_eq!((r.status.as_str(), r.passed), ("OK", Some(7)));
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = MockDataSource::new(dir.path(), &Actor::new("bob"));
        assert!(matches!(r, Err(Error::IOError(_))));
    }
}
