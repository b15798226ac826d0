use crate::{
    db::DbPool,
    entities::dining_table::{
        self, ActiveModel as TableActiveModel, Entity as TableEntity, Model as TableModel,
        TableStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTableRequest {
    #[validate(range(min = 1, message = "Table number must be positive"))]
    pub number: i32,
    pub zone: Option<String>,
    #[validate(range(min = 1, message = "Seat count must be positive"))]
    pub seats: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateTableStatusRequest {
    pub status: TableStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TableResponse {
    pub id: Uuid,
    pub number: i32,
    pub zone: Option<String>,
    pub seats: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<TableModel> for TableResponse {
    fn from(model: TableModel) -> Self {
        Self {
            id: model.id,
            number: model.number,
            zone: model.zone,
            seats: model.seats,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Service for managing dining tables.
#[derive(Clone)]
pub struct TableService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl TableService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(number = request.number))]
    pub async fn create_table(
        &self,
        request: CreateTableRequest,
    ) -> Result<TableResponse, ServiceError> {
        request.validate()?;

        let existing = TableEntity::find()
            .filter(dining_table::Column::Number.eq(request.number))
            .one(&*self.db_pool)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Table number {} already exists",
                request.number
            )));
        }

        let model = TableActiveModel {
            id: Set(Uuid::new_v4()),
            number: Set(request.number),
            zone: Set(request.zone),
            seats: Set(request.seats),
            status: Set(TableStatus::Free.as_str().to_string()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        Ok(model.into())
    }

    #[instrument(skip(self))]
    pub async fn list_tables(&self) -> Result<Vec<TableResponse>, ServiceError> {
        let tables = TableEntity::find()
            .order_by_asc(dining_table::Column::Number)
            .all(&*self.db_pool)
            .await?;
        Ok(tables.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_table(&self, table_id: Uuid) -> Result<TableResponse, ServiceError> {
        let table = self.find_table(table_id).await?;
        Ok(table.into())
    }

    /// Manual status override. The automatic transitions (occupied,
    /// bill-pending, back to free) belong to the order and billing flows;
    /// operators may only reserve a free table or release a reservation.
    #[instrument(skip(self, request), fields(table_id = %table_id))]
    pub async fn update_table_status(
        &self,
        table_id: Uuid,
        request: UpdateTableStatusRequest,
    ) -> Result<TableResponse, ServiceError> {
        let table = self.find_table(table_id).await?;
        let current = table.status().ok_or_else(|| {
            ServiceError::InternalError(format!("table {} has malformed status", table_id))
        })?;

        let allowed = matches!(
            (current, request.status),
            (TableStatus::Free, TableStatus::Reserved) | (TableStatus::Reserved, TableStatus::Free)
        );
        if !allowed {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot move table from {} to {} manually",
                current, request.status
            )));
        }

        let old_status = table.status.clone();
        let mut active: TableActiveModel = table.into();
        active.status = Set(request.status.as_str().to_string());
        let updated = active.update(&*self.db_pool).await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::TableStatusChanged {
                    table_id,
                    old_status,
                    new_status: updated.status.clone(),
                })
                .await
            {
                warn!(error = %e, "failed to publish table status event");
            }
        }

        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_table(&self, table_id: Uuid) -> Result<(), ServiceError> {
        let table = self.find_table(table_id).await?;
        let status = table.status().ok_or_else(|| {
            ServiceError::InternalError(format!("table {} has malformed status", table_id))
        })?;
        if status != TableStatus::Free {
            return Err(ServiceError::InvalidOperation(format!(
                "table {} is {}, only free tables can be removed",
                table.number, status
            )));
        }
        TableEntity::delete_by_id(table_id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    async fn find_table(&self, table_id: Uuid) -> Result<TableModel, ServiceError> {
        TableEntity::find_by_id(table_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Table with ID {} not found", table_id)))
    }
}
