//! DynamoDB-backed metadata store.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use tracing::{info, warn};

use super::MetadataStore;
use crate::config::MetadataConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Company, UPLOAD_RECORD_TYPE, UploadRecord};

type Item = HashMap<String, AttributeValue>;

/// Metadata store on two DynamoDB tables.
#[derive(Debug, Clone)]
pub struct DynamoMetadataStore {
    client: Client,
    companies_table: String,
    uploads_table: String,
}

impl DynamoMetadataStore {
    /// Create a client from the shared AWS configuration.
    pub fn new(sdk_config: &SdkConfig, config: &MetadataConfig) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);

        // Local emulator in development
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            "DynamoDB metadata store initialized: companies={}, uploads={}",
            config.companies_table, config.uploads_table
        );

        Self {
            client: Client::from_conf(builder.build()),
            companies_table: config.companies_table.clone(),
            uploads_table: config.uploads_table.clone(),
        }
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    async fn scan_companies(&self) -> AppResult<Vec<Company>> {
        let output = self
            .client
            .scan()
            .table_name(&self.companies_table)
            .send()
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to scan companies: {}", DisplayErrorContext(&e)))
            })?;

        Ok(output.items().iter().filter_map(company_from_item).collect())
    }

    async fn get_company(&self, company_id: &str) -> AppResult<Option<Company>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.companies_table)
            .key("companyId", AttributeValue::S(company_id.to_string()))
            .send()
            .await
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to get company '{}': {}",
                    company_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(output.item().and_then(company_from_item))
    }

    async fn create_company(&self, company: &Company) -> AppResult<()> {
        let result = self
            .client
            .put_item()
            .table_name(&self.companies_table)
            .set_item(Some(company_to_item(company)))
            .condition_expression("attribute_not_exists(companyId)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    Err(AppError::Conflict("Company already exists".to_string()))
                } else {
                    Err(AppError::Database(format!(
                        "Failed to create company '{}': {}",
                        company.company_id,
                        DisplayErrorContext(&service_error)
                    )))
                }
            }
        }
    }

    async fn scan_uploads(&self, limit: usize) -> AppResult<Vec<UploadRecord>> {
        let output = self
            .client
            .scan()
            .table_name(&self.uploads_table)
            .filter_expression("#type = :type")
            .expression_attribute_names("#type", "type")
            .expression_attribute_values(":type", AttributeValue::S(UPLOAD_RECORD_TYPE.to_string()))
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to scan uploads: {}", DisplayErrorContext(&e)))
            })?;

        Ok(output.items().iter().filter_map(upload_from_item).collect())
    }

    async fn scan_uploads_for_company(&self, company_id: &str) -> AppResult<Vec<UploadRecord>> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.uploads_table)
                .filter_expression("companyId = :companyId")
                .expression_attribute_values(
                    ":companyId",
                    AttributeValue::S(company_id.to_string()),
                )
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to scan uploads for '{}': {}",
                        company_id,
                        DisplayErrorContext(&e)
                    ))
                })?;

            records.extend(output.items().iter().filter_map(upload_from_item));

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn put_upload(&self, record: &UploadRecord) -> AppResult<()> {
        self.client
            .put_item()
            .table_name(&self.uploads_table)
            .set_item(Some(upload_to_item(record)))
            .send()
            .await
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to store upload record '{}': {}",
                    record.file_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(())
    }
}

fn string_attr(item: &Item, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(String::from)
}

fn company_to_item(company: &Company) -> Item {
    HashMap::from([
        (
            "companyId".to_string(),
            AttributeValue::S(company.company_id.clone()),
        ),
        (
            "companyName".to_string(),
            AttributeValue::S(company.company_name.clone()),
        ),
        (
            "createdAt".to_string(),
            AttributeValue::S(company.created_at.clone()),
        ),
    ])
}

fn company_from_item(item: &Item) -> Option<Company> {
    let Some(company_id) = string_attr(item, "companyId") else {
        warn!("Skipping company item without companyId");
        return None;
    };

    Some(Company {
        company_name: string_attr(item, "companyName").unwrap_or_else(|| company_id.clone()),
        created_at: string_attr(item, "createdAt").unwrap_or_default(),
        company_id,
    })
}

fn upload_to_item(record: &UploadRecord) -> Item {
    HashMap::from([
        ("fileId".to_string(), AttributeValue::S(record.file_id.clone())),
        ("type".to_string(), AttributeValue::S(record.record_type.clone())),
        (
            "timestamp".to_string(),
            AttributeValue::S(record.timestamp.clone()),
        ),
        (
            "companyId".to_string(),
            AttributeValue::S(record.company_id.clone()),
        ),
        ("S3Key".to_string(), AttributeValue::S(record.s3_key.clone())),
        ("data".to_string(), AttributeValue::S(record.data.clone())),
        (
            "uploadedBy".to_string(),
            AttributeValue::S(record.uploaded_by.clone()),
        ),
        ("status".to_string(), AttributeValue::S(record.status.clone())),
    ])
}

/// Items missing `fileId` or `S3Key` are not upload records and are skipped.
fn upload_from_item(item: &Item) -> Option<UploadRecord> {
    let file_id = string_attr(item, "fileId")?;
    let Some(s3_key) = string_attr(item, "S3Key") else {
        warn!("Skipping upload item {} without S3Key", file_id);
        return None;
    };

    Some(UploadRecord {
        file_id,
        record_type: string_attr(item, "type").unwrap_or_else(|| UPLOAD_RECORD_TYPE.to_string()),
        timestamp: string_attr(item, "timestamp").unwrap_or_default(),
        company_id: string_attr(item, "companyId").unwrap_or_default(),
        s3_key,
        data: string_attr(item, "data").unwrap_or_default(),
        uploaded_by: string_attr(item, "uploadedBy").unwrap_or_default(),
        status: string_attr(item, "status")
            .unwrap_or_else(|| crate::models::PENDING_STATUS.to_string()),
    })
}
