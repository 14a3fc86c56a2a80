use crate::prelude::*;
use judge_status::{Snapshot, TrackedItem};
use std::time::UNIX_EPOCH;

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<String> {
    info!(
        "loading file {}",
        path.as_ref().to_str().unwrap_or("[non UTF-8 path]")
    );
    std::fs::read_to_string(path).map_err(Error::IOError)
}

pub fn human_bytes(n: u64) -> String {
    Byte::from_bytes(n as u128)
        .get_appropriate_unit(true)
        .to_string()
}

/// One line describing `item`.
pub fn describe_item(item: &TrackedItem) -> String {
    let created = item
        .created_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!(
        "#{:<10} {:<8} {:<24} passed {:>3}  {:>6} ms  {:>10}  {}  @{}",
        item.id,
        item.target_ref,
        item.verdict.label(),
        item.passed_count,
        item.elapsed_ms,
        human_bytes(item.memory_bytes),
        item.language.as_deref().unwrap_or("-"),
        created,
    )
}

/// One line describing the tracked job of `snapshot` and the session
/// state.
pub fn describe_progress(snapshot: &Snapshot) -> String {
    let item = snapshot
        .items
        .first()
        .map_or_else(|| "no submission".to_owned(), describe_item);
    format!("[{:?}] {}", snapshot.phase, item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use judge_status::Verdict;
    use std::time::{Duration, SystemTime};

    fn item() -> TrackedItem {
        TrackedItem {
            id: 42,
            target_source_id: 1850,
            target_ref: "1850A".to_owned(),
            language: Some("Rust 2021".to_owned()),
            created_at: SystemTime::UNIX_EPOCH + Duration::from_secs(100),
            verdict: Verdict::WrongAnswer,
            passed_count: 3,
            elapsed_ms: 46,
            memory_bytes: 2 * 1024 * 1024,
        }
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(2 * 1024 * 1024), "2.00 MiB");
    }

    #[test]
    fn test_describe_item() {
        let line = describe_item(&item());
        assert!(line.starts_with("#42"));
        assert!(line.contains("wrong answer"));
        assert!(line.contains("2.00 MiB"));
        assert!(line.ends_with("@100"));
    }
}
