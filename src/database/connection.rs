use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::rows::{ChildColumns, ChildRow, QuestionRow};
use crate::{
    error::{FieldIssue, SaveError},
    identifier::{ChildId, QuestionId},
    payload::{IdMapping, QuestionRecord, SaveRequest, SaveResponse},
    question::QuestionType,
    transport::{MemoryServer, SaveTransport},
};

/// Postgres-backed question store; the server side of the autosave call.
#[derive(Debug, Clone)]
pub struct Connection {
    pool: PgPool,
}

impl Connection {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running migrations");
        sqlx::migrate!().run(&self.pool).await
    }
}

pub trait CreateQuestion {
    async fn create_question(
        &self,
        question_type: QuestionType,
        prompt: &str,
    ) -> Result<QuestionId, SaveError>;
}

pub trait FetchQuestion {
    async fn fetch_question(&self, id: &QuestionId) -> Result<Option<QuestionRecord>, SaveError>;
}

/// Deleting a question is immediate and cascades to its rows; it never goes
/// through autosave.
pub trait DeleteQuestion {
    async fn delete_question(&self, id: &QuestionId) -> Result<bool, SaveError>;
}

fn question_uuid(id: &QuestionId) -> Result<Uuid, SaveError> {
    Uuid::parse_str(id.as_str())
        .map_err(|_| SaveError::Validation(vec![FieldIssue::new(&["parentId"], "Not a question id")]))
}

impl CreateQuestion for Connection {
    #[instrument(level = "debug", skip(self))]
    async fn create_question(
        &self,
        question_type: QuestionType,
        prompt: &str,
    ) -> Result<QuestionId, SaveError> {
        let uuid = Uuid::new_v4();
        sqlx::query("INSERT INTO questions (uuid, question_type, prompt) VALUES ($1, $2, $3)")
            .bind(uuid)
            .bind(question_type.as_str())
            .bind(prompt)
            .execute(&self.pool)
            .await?;

        Ok(QuestionId::new(uuid.to_string()))
    }
}

impl FetchQuestion for Connection {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_question(&self, id: &QuestionId) -> Result<Option<QuestionRecord>, SaveError> {
        let uuid = question_uuid(id)?;
        let mut tx = self.pool.begin().await?;

        let question = sqlx::query_as::<_, QuestionRow>(
            "SELECT uuid, question_type, prompt, points, required, image, correct_answer, guidelines \
             FROM questions WHERE uuid = $1",
        )
        .bind(uuid)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(question) = question else {
            return Ok(None);
        };

        let children = sqlx::query_as::<_, ChildRow>(
            "SELECT uuid, kind, position, text, match_text, is_correct, points, image, match_image \
             FROM question_children WHERE question_id = $1 ORDER BY position",
        )
        .bind(uuid)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        question.into_record(children).map(Some)
    }
}

impl DeleteQuestion for Connection {
    #[instrument(level = "info", skip(self))]
    async fn delete_question(&self, id: &QuestionId) -> Result<bool, SaveError> {
        let uuid = question_uuid(id)?;
        let deleted = sqlx::query("DELETE FROM questions WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }
}

impl SaveTransport for Connection {
    #[instrument(level = "debug", skip_all, fields(question = %request.parent_id))]
    async fn save(&self, request: SaveRequest) -> Result<SaveResponse, SaveError> {
        let question = question_uuid(&request.parent_id)?;

        let mut deleted = Vec::with_capacity(request.deleted_ids.len());
        for (index, id) in request.deleted_ids.iter().enumerate() {
            let uuid = Uuid::parse_str(id).map_err(|_| {
                SaveError::Validation(vec![FieldIssue {
                    path: vec!["deletedIds".into(), index.to_string()],
                    message: format!("'{id}' is not a row id"),
                }])
            })?;
            deleted.push(uuid);
        }

        debug!("Creating transaction");
        let mut tx = self.pool.begin().await?;

        let scalar = &request.scalar;
        let updated = sqlx::query(
            "UPDATE questions SET prompt = $1, points = $2, required = $3, image = $4, \
             correct_answer = $5, guidelines = $6 WHERE uuid = $7 AND question_type = $8",
        )
        .bind(&scalar.prompt)
        .bind(scalar.points)
        .bind(scalar.required)
        .bind(scalar.image.as_deref())
        .bind(scalar.correct_answer)
        .bind(scalar.guidelines.as_deref())
        .bind(question)
        .bind(request.question_type.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(SaveError::Transport(format!(
                "{} question {} not found",
                request.question_type, request.parent_id
            )));
        }

        if !deleted.is_empty() {
            debug!("Deleting {} rows", deleted.len());
            sqlx::query("DELETE FROM question_children WHERE question_id = $1 AND uuid = ANY($2)")
                .bind(question)
                .bind(&deleted)
                .execute(&mut *tx)
                .await?;
        }

        let mut inserted = vec![];
        for (index, child) in request.children.iter().enumerate() {
            let uuid = match child.id() {
                ChildId::Temporary(temp) => {
                    let uuid = Uuid::new_v4();
                    inserted.push(IdMapping::new(*temp, uuid.to_string()));
                    uuid
                }
                ChildId::Persisted(id) => Uuid::parse_str(id).map_err(|_| {
                    SaveError::Validation(vec![FieldIssue {
                        path: vec!["children".into(), index.to_string(), "id".into()],
                        message: format!("'{id}' is not a row id"),
                    }])
                })?,
            };

            let columns = ChildColumns::from(child);
            sqlx::query(
                "INSERT INTO question_children \
                 (uuid, question_id, kind, position, text, match_text, is_correct, points, image, match_image) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (uuid) DO UPDATE SET position = EXCLUDED.position, text = EXCLUDED.text, \
                 match_text = EXCLUDED.match_text, is_correct = EXCLUDED.is_correct, \
                 points = EXCLUDED.points, image = EXCLUDED.image, match_image = EXCLUDED.match_image \
                 WHERE question_children.question_id = EXCLUDED.question_id",
            )
            .bind(uuid)
            .bind(question)
            .bind(columns.kind)
            .bind(columns.position)
            .bind(columns.text)
            .bind(columns.match_text)
            .bind(columns.is_correct)
            .bind(columns.points)
            .bind(columns.image)
            .bind(columns.match_image)
            .execute(&mut *tx)
            .await?;
        }

        debug!("Closing transaction");
        tx.commit().await?;

        Ok(SaveResponse::ok(inserted))
    }
}

impl CreateQuestion for MemoryServer {
    async fn create_question(
        &self,
        question_type: QuestionType,
        prompt: &str,
    ) -> Result<QuestionId, SaveError> {
        Ok(self.add_question(question_type, prompt).await)
    }
}

impl FetchQuestion for MemoryServer {
    async fn fetch_question(&self, id: &QuestionId) -> Result<Option<QuestionRecord>, SaveError> {
        Ok(self.fetch(id).await)
    }
}

impl DeleteQuestion for MemoryServer {
    async fn delete_question(&self, id: &QuestionId) -> Result<bool, SaveError> {
        Ok(self.remove_question(id).await)
    }
}
