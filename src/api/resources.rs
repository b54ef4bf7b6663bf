use super::client::ApiClient;
use super::session::SessionUser;
use crate::error::ApiError;
use crate::schema::Resource;
use crate::validation::ReturnRequest;
use crate::value::Record;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResult {
    #[serde(default)]
    pub imported: usize,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub errors: Vec<BulkRowError>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRowError {
    #[serde(default)]
    pub row: usize,
    #[serde(default)]
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(default)]
    pub id: serde_json::Value,
    pub action: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: serde_json::Value,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ApiClient {
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser, ApiError> {
        let body = json!({ "email": email, "password": password });
        let response: LoginResponse = self
            .single_flight("login", self.post("/auth/login", &body))
            .await?;
        self.session()
            .login(response.token, Some(response.user.clone()))?;
        info!(email = %response.user.email, role = %response.user.role, "Logged in");
        Ok(response.user)
    }

    /// Tells the backend, then forgets the local token even if that call failed.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let remote = if self.session().is_authenticated() {
            self.post::<serde_json::Value, _>("/auth/logout", &json!({}))
                .await
                .map(|_| ())
        } else {
            Ok(())
        };
        self.session().logout()?;
        match remote {
            Err(ApiError::MissingData(_)) | Err(ApiError::Unauthorized { .. }) => Ok(()),
            other => other,
        }
    }

    pub async fn me(&self) -> Result<SessionUser, ApiError> {
        let user: SessionUser = self.get("/auth/me").await?;
        self.session().set_user(user.clone());
        Ok(user)
    }

    pub async fn list(&self, resource: Resource) -> Result<Vec<Record>, ApiError> {
        self.get(resource.path()).await
    }

    pub async fn get_record(&self, resource: Resource, id: &str) -> Result<Record, ApiError> {
        self.get(&item_path(resource, id)).await
    }

    pub async fn create(&self, resource: Resource, record: &Record) -> Result<Record, ApiError> {
        let key = format!("create:{}", resource.name());
        self.single_flight(&key, self.post(resource.path(), record))
            .await
    }

    pub async fn update(
        &self,
        resource: Resource,
        id: &str,
        record: &Record,
    ) -> Result<Record, ApiError> {
        let path = item_path(resource, id);
        let key = format!("update:{}", path);
        self.single_flight(&key, self.put(&path, record)).await
    }

    pub async fn patch_record(
        &self,
        resource: Resource,
        id: &str,
        changes: &Record,
    ) -> Result<Record, ApiError> {
        let path = item_path(resource, id);
        let key = format!("patch:{}", path);
        self.single_flight(&key, self.patch(&path, changes)).await
    }

    pub async fn delete_record(&self, resource: Resource, id: &str) -> Result<(), ApiError> {
        let path = item_path(resource, id);
        let key = format!("delete:{}", path);
        self.single_flight(&key, self.delete(&path)).await
    }

    pub async fn bulk_import(
        &self,
        resource: Resource,
        records: &[Record],
    ) -> Result<BulkImportResult, ApiError> {
        let path = format!("{}/bulk", resource.path());
        let key = format!("import:{}", resource.name());
        let body = json!({ "records": records });
        let result: BulkImportResult = self.single_flight(&key, self.post(&path, &body)).await?;
        info!(
            resource = resource.name(),
            imported = result.imported,
            failed = result.failed,
            "Bulk import finished"
        );
        Ok(result)
    }

    /// The request should already have passed `validate_return`.
    pub async fn return_assignment(
        &self,
        id: &str,
        request: &ReturnRequest,
    ) -> Result<Record, ApiError> {
        let path = format!("{}/return", item_path(Resource::Assignments, id));
        let key = format!("return:{}", id);
        self.single_flight(&key, self.patch(&path, request)).await
    }

    pub async fn activity_log(&self, limit: usize) -> Result<Vec<ActivityEntry>, ApiError> {
        self.get(&format!("/activity-log?limit={}", limit)).await
    }
}

fn item_path(resource: Resource, id: &str) -> String {
    format!("{}/{}", resource.path(), id)
}
