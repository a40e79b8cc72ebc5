use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value};

use crate::models::user::User;
use crate::repositories::errors::user_repository_errors::UserRepositoryError;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, UserRepositoryError>;
    async fn get_user_by_mobile(&self, mobile: &str) -> Result<Option<User>, UserRepositoryError>;
}

pub struct DynamoDbUserRepository {
    pub client: Client,
    pub table_name: String,
    pub mobile_index: String,
}

impl DynamoDbUserRepository {
    pub fn new(
        client: Client,
        table_name: impl Into<String>,
        mobile_index: impl Into<String>,
    ) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            mobile_index: mobile_index.into(),
        }
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, UserRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "id",
                to_attribute_value(user_id)
                    .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| UserRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                let user: User = from_item(item)
                    .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn get_user_by_mobile(&self, mobile: &str) -> Result<Option<User>, UserRepositoryError> {
        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.mobile_index)
            .key_condition_expression("mobile = :mobile")
            .expression_attribute_values(
                ":mobile",
                to_attribute_value(mobile)
                    .map_err(|e| UserRepositoryError::Serialization(e.to_string()))?,
            )
            .limit(1)
            .send()
            .await;

        match result {
            Ok(output) => {
                // The index may project keys only, so read the full item by id.
                let user_id = output
                    .items
                    .unwrap_or_default()
                    .into_iter()
                    .next()
                    .and_then(|item| item.get("id").and_then(|id| id.as_s().ok()).cloned());
                match user_id {
                    Some(user_id) => self.get_user_by_id(&user_id).await,
                    None => Ok(None),
                }
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("ResourceNotFoundException") {
                    return Err(UserRepositoryError::DynamoDb(format!(
                        "User mobile index not available. Please ensure the GSI '{}' exists and is active.",
                        self.mobile_index
                    )));
                }
                Err(UserRepositoryError::DynamoDb(error_str))
            }
        }
    }
}
