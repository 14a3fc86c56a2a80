use crate::prelude::*;
use judge_status::{Actor, ActorInfo, JobId, RawSubmission, RemoteStatusGateway, SourceId, Target};
use serde::de::DeserializeOwned;

type Query = Vec<(&'static str, String)>;

/// How many recent submissions are scanned to find the latest one on a
/// target, or one by id.
const RECENT: usize = 20;

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    comment: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Problem {
    contest_id: Option<u64>,
    index: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Submission {
    id: JobId,
    contest_id: Option<u64>,
    creation_time_seconds: u64,
    problem: Problem,
    programming_language: Option<String>,
    verdict: Option<String>,
    passed_test_count: Option<u32>,
    time_consumed_millis: Option<u64>,
    memory_consumed_bytes: Option<u64>,
}

impl Submission {
    fn source_id(&self) -> Option<SourceId> {
        self.contest_id.or(self.problem.contest_id)
    }

    fn is_on(&self, target: &Target) -> bool {
        self.problem.index == target.index
            && self.problem.contest_id.or(self.contest_id) == Some(target.source_id)
    }

    fn into_raw(self) -> RawSubmission {
        let target_ref = self
            .problem
            .contest_id
            .or(self.contest_id)
            .map_or_else(String::new, |x| x.to_string())
            + &self.problem.index;
        RawSubmission {
            id: self.id,
            source_id: self.source_id(),
            target_ref,
            language: self.programming_language,
            created_at: self.creation_time_seconds,
            status: self.verdict.unwrap_or_default(),
            passed: self.passed_test_count,
            elapsed_ms: self.time_consumed_millis,
            memory_bytes: self.memory_consumed_bytes,
        }
    }
}

fn net<E: std::fmt::Display>(e: E) -> judge_status::Error {
    judge_status::Error::Network(e.to_string())
}

/// The [Codeforces API](https://codeforces.com/apiHelp).
pub struct CodeforcesDataSource {
    client: reqwest::blocking::Client,
    api_base: String,
}

pub fn get<S: AsRef<str>>(api_base: S) -> Result<CodeforcesDataSource> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|e| Error::TrackingError(net(e)))?;
    Ok(CodeforcesDataSource {
        client,
        api_base: api_base.as_ref().trim_end_matches('/').to_owned(),
    })
}

impl CodeforcesDataSource {
    async fn call<T>(&self, method: &str, query: Query) -> judge_status::Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.client.clone();
        let url = format!("{}/{}", self.api_base, method);
        debug!("GET {} {:?}", url, query);
        // The blocking client must not run on the async executor.
        async_std::task::spawn_blocking(move || {
            let body = client
                .get(&url)
                .query(&query)
                .send()
                .map_err(net)?
                .text()
                .map_err(net)?;
            let resp: Envelope<T> = serde_json::from_str(&body).map_err(net)?;
            if resp.status != "OK" {
                let comment = resp.comment.unwrap_or_else(|| resp.status.clone());
                // Codeforces reports unknown handles this way.
                if comment.starts_with("handle") {
                    return Err(judge_status::Error::Auth(comment));
                }
                return Err(judge_status::Error::Network(comment));
            }
            resp.result
                .ok_or_else(|| judge_status::Error::Network("empty result".to_owned()))
        })
        .await
    }

    async fn user_status(
        &self,
        actor: &Actor,
        count: usize,
    ) -> judge_status::Result<Vec<Submission>> {
        let query = vec![
            ("handle", actor.handle().to_owned()),
            ("from", "1".to_owned()),
            ("count", count.to_string()),
        ];
        self.call("user.status", query).await
    }
}

#[async_trait::async_trait]
impl RemoteStatusGateway for CodeforcesDataSource {
    async fn list_submissions(
        &self,
        actor: &Actor,
        target: &Target,
        limit: usize,
    ) -> judge_status::Result<Vec<RawSubmission>> {
        let list = self.user_status(actor, limit).await?;
        Ok(list
            .into_iter()
            .filter(|x| x.is_on(target))
            .map(Submission::into_raw)
            .collect())
    }

    async fn fetch_actor_info(&self, actor: &Actor) -> judge_status::Result<ActorInfo> {
        let query = vec![("handles", actor.handle().to_owned())];
        let users: Vec<ActorInfo> = self.call("user.info", query).await?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| judge_status::Error::Auth(actor.handle().to_owned()))
    }

    async fn fetch_latest_submission(
        &self,
        actor: &Actor,
        target: &Target,
    ) -> judge_status::Result<Option<RawSubmission>> {
        let list = self.user_status(actor, RECENT).await?;
        Ok(list
            .into_iter()
            .find(|x| x.is_on(target))
            .map(Submission::into_raw))
    }

    async fn fetch_by_job_id(
        &self,
        source_id: SourceId,
        actor: &Actor,
        id: JobId,
    ) -> judge_status::Result<Option<RawSubmission>> {
        let query = vec![
            ("contestId", source_id.to_string()),
            ("handle", actor.handle().to_owned()),
            ("from", "1".to_owned()),
            ("count", RECENT.to_string()),
        ];
        let list: Vec<Submission> = self.call("contest.status", query).await?;
        Ok(list
            .into_iter()
            .find(|x| x.id == id)
            .map(Submission::into_raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_STATUS: &str = r#"{
        "status": "OK",
        "result": [{
            "id": 215000001,
            "contestId": 1850,
            "creationTimeSeconds": 1690000000,
            "problem": {"contestId": 1850, "index": "A", "name": "To My Critics"},
            "programmingLanguage": "Rust 2021",
            "testset": "TESTS",
            "passedTestCount": 0
        }]
    }"#;

    #[test]
    fn test_decode_submission() {
        let e: Envelope<Vec<Submission>> = serde_json::from_str(USER_STATUS).unwrap();
        assert_eq!(e.status, "OK");
        let s = e.result.unwrap().into_iter().next().unwrap();
        assert!(s.is_on(&Target::new(1850, "A")));
        assert!(!s.is_on(&Target::new(1850, "B")));
        let raw = s.into_raw();
        assert_eq!(raw.target_ref, "1850A");
        assert_eq!(raw.source_id, Some(1850));
        assert_eq!(raw.verdict(), judge_status::Verdict::Pending);
    }

    #[test]
    fn test_decode_failure() {
        let e: Envelope<Vec<Submission>> =
            serde_json::from_str(r#"{"status":"FAILED","comment":"handle: not found"}"#).unwrap();
        assert_eq!(e.status, "FAILED");
        assert!(e.result.is_none());
    }
}
