// cliprate-core/src/application/session.rs
//
// One participant's pass through the survey, from welcome to completion.
// The session owns the page state machine and the playlist; the UI layer on
// top only forwards events and renders whatever the session exposes.

use rand::Rng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::application::gateway::PersistenceGateway;
use crate::domain::device::{ClientSignals, DeviceInfo};
use crate::domain::flow::{transition, BackGuard, Event, FlowContext, Page};
use crate::domain::metadata::{score_outcomes, MetadataTable, OutcomeReport};
use crate::domain::participant::{missing_required_fields, Participant, QuestionnaireField};
use crate::domain::rating::{build_rating_record, snake_case_key};
use crate::domain::sampler;
use crate::domain::scale::ScaleSet;
use crate::domain::validator;
use crate::error::ClipRateError;
use crate::infrastructure::config::{
    load_config, load_questionnaire_fields, load_rating_scales, AppConfig,
};
use crate::infrastructure::metadata::load_metadata;
use serde_json::Value;

pub struct SurveySession {
    project_dir: PathBuf,
    pub config: AppConfig,
    pub questionnaire: Vec<QuestionnaireField>,
    pub scales: ScaleSet,
    pub metadata: MetadataTable,
    pub gateway: PersistenceGateway,
    pub participant: Participant,
    pub page: Page,
    back_guard: BackGuard,
    playlist: Vec<String>,
    position: usize,
    familiarization_pool: Vec<String>,
    familiarization_position: usize,
    device: Option<DeviceInfo>,
    /// Outcome guesses keyed by video id, scored on the completion screen.
    predictions: BTreeMap<String, String>,
}

impl SurveySession {
    /// Load every configured artifact and start at the welcome page.
    #[instrument(skip(project_dir))]
    pub fn open(project_dir: &Path) -> Result<Self, ClipRateError> {
        let config = load_config(project_dir).map_err(ClipRateError::Infrastructure)?;
        let questionnaire = load_questionnaire_fields(project_dir, &config)
            .map_err(ClipRateError::Infrastructure)?;
        let scales =
            load_rating_scales(project_dir, &config).map_err(ClipRateError::Infrastructure)?;

        let metadata = match &config.paths.metadata_path {
            Some(rel) => load_metadata(&project_dir.join(rel)),
            None => MetadataTable::default(),
        };

        let gateway = PersistenceGateway::from_config(project_dir, &config)?;

        info!(
            scales = scales.scales.len(),
            questions = questionnaire.len(),
            metadata_rows = metadata.len(),
            "Survey session ready"
        );

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config,
            questionnaire,
            scales,
            metadata,
            gateway,
            participant: Participant::default(),
            page: Page::Welcome,
            back_guard: BackGuard::default(),
            playlist: Vec::new(),
            position: 0,
            familiarization_pool: Vec::new(),
            familiarization_position: 0,
            device: None,
            predictions: BTreeMap::new(),
        })
    }

    fn flow_context(&self) -> FlowContext {
        FlowContext {
            familiarization_enabled: self.config.settings.enable_familiarization,
        }
    }

    /// Forward one navigation event through the transition table.
    /// Any successful move disarms the back guard.
    pub fn advance(&mut self, event: Event) -> Result<Page, ClipRateError> {
        self.page = transition(self.page, event, self.flow_context())?;
        self.back_guard.reset();
        info!(page = %self.page, "Page changed");
        Ok(self.page)
    }

    /// Backward navigation with a two-click confirmation: the first request
    /// arms the guard and stays put (`None`), the second one moves.
    pub fn request_back(&mut self) -> Result<Option<Page>, ClipRateError> {
        if self.back_guard.request() {
            Ok(Some(self.advance(Event::Back)?))
        } else {
            Ok(None)
        }
    }

    pub fn back_guard_armed(&self) -> bool {
        self.back_guard.is_armed()
    }

    /// Remember the client's device fingerprint; stamped onto every rating.
    pub fn record_device(&mut self, user_agent: &str, signals: ClientSignals) {
        self.device = Some(DeviceInfo::detect(user_agent, signals));
    }

    // --- LOGIN / INTAKE ---

    /// Returning participant path. False means "unknown id": the caller stays
    /// on the login page and shows the hint.
    pub async fn login_returning(&mut self, user_id: &str) -> Result<bool, ClipRateError> {
        if !self.gateway.user_exists(user_id).await {
            warn!(user_id, "Unknown participant id at login");
            return Ok(false);
        }
        self.participant.user_id = user_id.to_uppercase();
        self.advance(Event::ReturningUser)?;
        Ok(true)
    }

    pub fn login_new_user(&mut self) -> Result<Page, ClipRateError> {
        self.advance(Event::NewUser)
    }

    pub fn give_consent(&mut self) -> Result<Page, ClipRateError> {
        self.participant.give_consent();
        self.advance(Event::Next)
    }

    /// Validate the questionnaire, mint a fresh participant id and persist
    /// the intake record. A non-empty return lists the missing field titles
    /// and leaves the page unchanged.
    pub async fn submit_questionnaire<R: Rng>(
        &mut self,
        rng: &mut R,
    ) -> Result<Vec<String>, ClipRateError> {
        let missing: Vec<String> = missing_required_fields(&self.questionnaire, &self.participant)
            .into_iter()
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return Ok(missing);
        }

        let existing = self.gateway.all_user_ids().await;
        let user_id = self.participant.generate_user_id(&existing, rng)?;
        info!(user_id = %user_id, "New participant registered");

        if !self.gateway.save_user(&self.participant.to_record()).await {
            // Retryable: the participant keeps their answers and id.
            return Ok(vec![
                "Your data could not be saved. Please try again.".to_string()
            ]);
        }
        self.advance(Event::Next)?;
        Ok(Vec::new())
    }

    // --- VIDEO POOLS ---

    /// Action ids available on disk: the stem of every video file directly
    /// inside the configured directory, sorted for determinism.
    pub fn scan_video_pool(&self) -> Result<Vec<String>, ClipRateError> {
        list_video_stems(&self.project_dir.join(&self.config.paths.video_path))
    }

    /// Pool minus this participant's already-rated ids, minus videos that
    /// reached `min_ratings_per_video` across all participants.
    pub async fn eligible_pool(&self) -> Result<Vec<String>, ClipRateError> {
        let pool = self.scan_video_pool()?;
        let rated = self.gateway.rated_action_ids(&self.participant.user_id).await;
        let counts = self.gateway.rating_counts().await;
        let saturation = self.config.settings.min_ratings_per_video;

        Ok(pool
            .into_iter()
            .filter(|id| !rated.contains(id))
            .filter(|id| {
                saturation == 0 || counts.get(id).copied().unwrap_or(0) < saturation
            })
            .collect())
    }

    /// Build this participant's playlist from the eligible pool.
    pub async fn begin_rating<R: Rng>(&mut self, rng: &mut R) -> Result<(), ClipRateError> {
        let eligible = self.eligible_pool().await?;
        self.playlist = sampler::select(
            &eligible,
            &self.metadata,
            self.config.settings.number_of_videos,
            &self.config.settings.variables_for_stratification,
            rng,
        );
        self.position = 0;
        info!(
            eligible = eligible.len(),
            playlist = self.playlist.len(),
            "Playlist built"
        );

        // Nothing left to rate: straight to the completion screen.
        if self.playlist.is_empty() && self.page == Page::VideoPlayer {
            self.advance(Event::RatingsExhausted)?;
        }
        Ok(())
    }

    pub fn playlist(&self) -> &[String] {
        &self.playlist
    }

    pub fn current_video(&self) -> Option<&str> {
        self.playlist.get(self.position).map(String::as_str)
    }

    pub fn remaining(&self) -> usize {
        self.playlist.len().saturating_sub(self.position)
    }

    /// Metadata row for the clip on screen, when metadata is configured.
    pub fn current_metadata(&self) -> Option<&BTreeMap<String, String>> {
        self.current_video().and_then(|id| self.metadata.get(id))
    }

    // --- RATING ---

    /// Validate and persist one rating screen. A non-empty return lists the
    /// validation messages; the participant stays on the current clip.
    /// On success the playlist advances, flipping to the completion page
    /// after the last clip.
    pub async fn submit_rating(
        &mut self,
        values: &BTreeMap<String, Value>,
    ) -> Result<Vec<String>, ClipRateError> {
        let Some(action_id) = self.current_video().map(String::from) else {
            return Err(ClipRateError::InternalError(
                "Rating submitted with no current video".to_string(),
            ));
        };

        let errors = validator::validate(values, &self.scales);
        if !errors.is_empty() {
            return Ok(errors);
        }

        if let Some(prediction) = self.outcome_prediction(values) {
            self.predictions.insert(action_id.clone(), prediction);
        }

        let record = build_rating_record(
            &self.participant.user_id,
            &action_id,
            values,
            self.device.as_ref(),
        );
        if !self.gateway.save_rating(&record).await {
            // Retryable: stay on the current clip, nothing advanced.
            self.predictions.remove(&action_id);
            return Ok(vec![
                "Your rating could not be saved. Please try again.".to_string()
            ]);
        }

        self.position += 1;
        self.back_guard.reset();
        if self.position >= self.playlist.len() {
            self.advance(Event::RatingsExhausted)?;
        }
        Ok(Vec::new())
    }

    /// The submitted value of the scale matching the outcome column, if the
    /// scale set carries one ("WinLoss" column vs a "Win Loss" scale).
    fn outcome_prediction(&self, values: &BTreeMap<String, Value>) -> Option<String> {
        let wanted = normalize(&self.config.settings.outcome_column);
        let scale = self
            .scales
            .scales
            .iter()
            .find(|s| normalize(&s.title) == wanted)?;

        match values.get(&scale.title) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    // --- FAMILIARIZATION ---

    /// Practice clips cycle forever in sorted order; nothing is persisted.
    pub fn next_familiarization_video(&mut self) -> Result<Option<String>, ClipRateError> {
        if self.familiarization_pool.is_empty() {
            self.familiarization_pool = list_video_stems(
                &self.project_dir.join(&self.config.paths.familiarization_video_path),
            )?;
        }
        if self.familiarization_pool.is_empty() {
            return Ok(None);
        }

        let video = self.familiarization_pool[self.familiarization_position].clone();
        self.familiarization_position =
            (self.familiarization_position + 1) % self.familiarization_pool.len();
        Ok(Some(video))
    }

    // --- COMPLETION ---

    /// Confusion matrix of this session's outcome guesses.
    pub fn completion_report(&self) -> OutcomeReport {
        score_outcomes(
            &self.predictions,
            &self.metadata,
            &self.config.settings.outcome_column,
        )
    }
}

/// Lowercased, underscores and spaces stripped: "Win Loss" == "WinLoss".
fn normalize(title: &str) -> String {
    snake_case_key(title).replace('_', "")
}

/// Stems of the `.mp4` files directly inside `dir`, sorted.
/// A missing directory is an empty pool, not an error.
fn list_video_stems(dir: &Path) -> Result<Vec<String>, ClipRateError> {
    if !dir.exists() {
        warn!(dir = ?dir, "Video directory not found, pool is empty");
        return Ok(Vec::new());
    }

    let mut stems = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry =
            entry.map_err(|e| ClipRateError::InternalError(e.to_string()))?;
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"))
        {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
    }
    stems.sort();
    Ok(stems)
}
