use crate::error::CommandError;
use crate::state::AppState;
use leadgen_core::JobId;
use leadgen_scanner::{Contact, JobState, JobSummary};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub query: String,
    pub location: String,
    pub target_count: u32,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub state: JobState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactResponse {
    pub business_name: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub source_url: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            business_name: contact.business_name,
            emails: contact.emails.into_iter().collect(),
            phones: contact.phones.into_iter().collect(),
            source_url: contact.source_url,
        }
    }
}

fn parse_job_id(job_id: &str) -> Result<JobId, CommandError> {
    JobId::new(job_id).map_err(|e| CommandError::new("INVALID_JOB_ID", e.to_string()))
}

fn parse_state(filter: &str) -> Result<JobState, CommandError> {
    match filter.trim().to_ascii_lowercase().as_str() {
        "queued" => Ok(JobState::Queued),
        "processing" => Ok(JobState::Processing),
        "completed" => Ok(JobState::Completed),
        "failed" => Ok(JobState::Failed),
        other => Err(CommandError::with_details(
            "INVALID_FILTER",
            format!("unknown job state '{other}'"),
            serde_json::json!({ "allowed": ["queued", "processing", "completed", "failed"] }),
        )),
    }
}

/// Submit a new lead-generation job.
pub async fn submit_job(
    state: &AppState,
    request: SubmitJobRequest,
) -> Result<SubmitJobResponse, CommandError> {
    info!(
        "Submitting job: query='{}', location='{}', target={}",
        request.query, request.location, request.target_count
    );

    let job_id = state
        .orchestrator
        .submit(&request.query, &request.location, request.target_count)
        .await?;
    let job = state.orchestrator.get_job(&job_id).await?;

    Ok(SubmitJobResponse {
        job_id: job_id.to_string(),
        state: job.state(),
    })
}

/// Get the status of a job.
pub async fn get_job(state: &AppState, job_id: &str) -> Result<JobSummary, CommandError> {
    let job_id = parse_job_id(job_id)?;
    let job = state.orchestrator.get_job(&job_id).await?;
    Ok(job.summary(state.orchestrator.config().jobs.poll_interval_secs))
}

/// List jobs, optionally filtered by state name.
pub async fn list_jobs(
    state: &AppState,
    filter: Option<&str>,
) -> Result<Vec<JobSummary>, CommandError> {
    let filter = filter.map(parse_state).transpose()?;
    Ok(state.orchestrator.list_jobs(filter).await?)
}

/// Contacts of a completed job.
pub async fn get_results(
    state: &AppState,
    job_id: &str,
) -> Result<Vec<ContactResponse>, CommandError> {
    let job_id = parse_job_id(job_id)?;
    let contacts = state.orchestrator.results(&job_id).await?;
    Ok(contacts.into_iter().map(ContactResponse::from).collect())
}

/// Cancel a queued or running job.
pub async fn cancel_job(state: &AppState, job_id: &str) -> Result<(), CommandError> {
    let job_id = parse_job_id(job_id)?;
    info!("Cancelling job {}", job_id);
    state.orchestrator.cancel(&job_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(parse_state(" Completed ").unwrap(), JobState::Completed);
        let err = parse_state("done").unwrap_err();
        assert_eq!(err.code, "INVALID_FILTER");
    }

    #[test]
    fn test_parse_job_id() {
        assert!(parse_job_id("plumbers_boston_1700000000000").is_ok());
        assert_eq!(
            parse_job_id("../etc/passwd").unwrap_err().code,
            "INVALID_JOB_ID"
        );
    }

    #[test]
    fn test_contact_response_sorted_sets() {
        let contact = Contact::new("https://acme.example/")
            .with_email("sales@acme.example")
            .with_email("info@acme.example")
            .with_phone("6175550142");
        let response = ContactResponse::from(contact);
        assert_eq!(
            response.emails,
            vec!["info@acme.example", "sales@acme.example"]
        );
        assert_eq!(response.phones, vec!["6175550142"]);
    }
}
