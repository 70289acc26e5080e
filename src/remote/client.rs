//! AWS CloudFormation implementation of [`CloudFormationApi`].
//!
//! Retries are left to the SDK's standard retry strategy. List operations
//! collect every page through the SDK paginators before returning.
//! `DescribeChangeSet` has no generated paginator and follows its
//! continuation token through [`drain_pages`].

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::primitives::DateTime as SdkDateTime;
use aws_sdk_cloudformation::types::{
    Capability, Change as SdkChange, ChangeSetSummary as SdkChangeSetSummary,
    ChangeSetType as SdkChangeSetType, Parameter, StackEvent as SdkStackEvent,
};
use aws_sdk_cloudformation::Client;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ServiceError, ServiceResult};

use super::api::CloudFormationApi;
use super::types::{
    Change, ChangeSetDescription, ChangeSetRequest, ChangeSetSummary, ChangeSetType,
    ResourceChange, StackDescription, StackEvent, StackRequest, StackResource,
};

/// Maximum attempts per request, including the first one.
const MAX_ATTEMPTS: u32 = 3;

/// CloudFormation client backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsCloudFormation {
    /// SDK client.
    client: Client,
}

impl AwsCloudFormation {
    /// Builds a client from the SDK's default configuration chain.
    ///
    /// Region and profile from `config` take precedence over the chain.
    pub async fn connect(config: &ClientConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS));

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }

        let sdk_config = loader.load().await;
        debug!(
            "CloudFormation client ready (region: {})",
            sdk_config
                .region()
                .map_or_else(|| String::from("unset"), ToString::to_string)
        );

        Self {
            client: Client::new(&sdk_config),
        }
    }

    /// Wraps an existing SDK client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// One page of a paginated listing.
struct Page<T> {
    items: Vec<T>,
    next_token: Option<String>,
}

/// Collects every page of a response, following continuation tokens.
async fn drain_pages<T, F, Fut>(mut fetch: F) -> ServiceResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ServiceResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token = None;

    loop {
        let page = fetch(token.take()).await?;
        items.extend(page.items);

        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => return Ok(items),
        }
    }
}

fn service_error<E, R>(operation: &str, err: &SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let service = err.as_service_error();
    let code = service.and_then(|e| e.code()).map(str::to_string);
    let message = service
        .and_then(|e| e.message())
        .map_or_else(|| DisplayErrorContext(err).to_string(), str::to_string);

    ServiceError::new(operation, code, message)
}

fn timestamp(value: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

fn request_token() -> String {
    Uuid::new_v4().to_string()
}

fn capabilities() -> Vec<Capability> {
    vec![Capability::CapabilityIam, Capability::CapabilityNamedIam]
}

fn sdk_parameters(pairs: &[(String, String)]) -> Vec<Parameter> {
    pairs
        .iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

fn stack_event(event: &SdkStackEvent) -> Option<StackEvent> {
    Some(StackEvent {
        timestamp: event.timestamp().and_then(timestamp)?,
        logical_id: event.logical_resource_id().unwrap_or_default().to_string(),
        resource_type: event.resource_type().unwrap_or_default().to_string(),
        status: event
            .resource_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        reason: event.resource_status_reason().map(str::to_string),
    })
}

fn change_set_summary(summary: &SdkChangeSetSummary) -> Option<ChangeSetSummary> {
    Some(ChangeSetSummary {
        name: summary.change_set_name()?.to_string(),
        status: summary
            .status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        execution_status: summary
            .execution_status()
            .map(|s| s.as_str().to_string()),
        status_reason: summary.status_reason().map(str::to_string),
        description: summary.description().map(str::to_string),
        created_at: summary.creation_time().and_then(timestamp),
    })
}

fn change(change: &SdkChange) -> Change {
    let kind = change
        .r#type()
        .map_or("Resource", |t| t.as_str())
        .to_string();

    match change.resource_change() {
        Some(resource) if kind == "Resource" => Change::Resource(ResourceChange {
            action: resource
                .action()
                .map(|a| a.as_str().to_string())
                .unwrap_or_default(),
            logical_id: resource.logical_resource_id().unwrap_or_default().to_string(),
            resource_type: resource.resource_type().unwrap_or_default().to_string(),
            physical_id: resource.physical_resource_id().map(str::to_string),
            scope: resource
                .scope()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            replacement: resource
                .replacement()
                .map(|r| r.as_str().to_string()),
        }),
        _ => Change::Other { kind },
    }
}

#[async_trait]
impl CloudFormationApi for AwsCloudFormation {
    async fn list_stacks(&self) -> ServiceResult<BTreeMap<String, String>> {
        let stacks = self
            .client
            .describe_stacks()
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| service_error("DescribeStacks", &e))?;

        Ok(stacks
            .iter()
            .filter_map(|stack| {
                let name = stack.stack_name()?.to_string();
                let status = stack
                    .stack_status()
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default();
                Some((name, status))
            })
            .collect())
    }

    async fn describe_stack(&self, name: &str) -> ServiceResult<StackDescription> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| service_error("DescribeStacks", &e))?;

        let stack = output
            .stacks()
            .first()
            .ok_or_else(|| {
                ServiceError::new("DescribeStacks", None, format!("Stack with id {name} does not exist"))
            })?;

        Ok(StackDescription {
            status: stack
                .stack_status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            parameters: stack
                .parameters()
                .iter()
                .filter_map(|p| {
                    Some((
                        p.parameter_key()?.to_string(),
                        p.parameter_value().unwrap_or_default().to_string(),
                    ))
                })
                .collect(),
            outputs: stack
                .outputs()
                .iter()
                .filter_map(|o| {
                    Some((
                        o.output_key()?.to_string(),
                        o.output_value().unwrap_or_default().to_string(),
                    ))
                })
                .collect(),
        })
    }

    async fn list_stack_resources(
        &self,
        name: &str,
    ) -> ServiceResult<BTreeMap<String, StackResource>> {
        let summaries = self
            .client
            .list_stack_resources()
            .stack_name(name)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| service_error("ListStackResources", &e))?;

        Ok(summaries
            .iter()
            .filter_map(|r| {
                let logical_id = r.logical_resource_id()?.to_string();
                Some((
                    logical_id,
                    StackResource {
                        resource_type: r.resource_type().unwrap_or_default().to_string(),
                        physical_id: r.physical_resource_id().map(str::to_string),
                        status: r
                            .resource_status()
                            .map(|s| s.as_str().to_string())
                            .unwrap_or_default(),
                    },
                ))
            })
            .collect())
    }

    async fn get_template(&self, name: &str) -> ServiceResult<String> {
        let output = self
            .client
            .get_template()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| service_error("GetTemplate", &e))?;

        Ok(output.template_body().unwrap_or_default().to_string())
    }

    async fn validate_template(&self, body: &str) -> ServiceResult<()> {
        self.client
            .validate_template()
            .template_body(body)
            .send()
            .await
            .map_err(|e| service_error("ValidateTemplate", &e))?;
        Ok(())
    }

    async fn create_stack(&self, request: &StackRequest) -> ServiceResult<String> {
        let output = self
            .client
            .create_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(Some(sdk_parameters(&request.parameters)))
            .set_capabilities(Some(capabilities()))
            .client_request_token(request_token())
            .send()
            .await
            .map_err(|e| service_error("CreateStack", &e))?;

        Ok(output.stack_id().unwrap_or_default().to_string())
    }

    async fn update_stack(&self, request: &StackRequest) -> ServiceResult<String> {
        let output = self
            .client
            .update_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .set_parameters(Some(sdk_parameters(&request.parameters)))
            .set_capabilities(Some(capabilities()))
            .client_request_token(request_token())
            .send()
            .await
            .map_err(|e| service_error("UpdateStack", &e))?;

        Ok(output.stack_id().unwrap_or_default().to_string())
    }

    async fn delete_stack(&self, name: &str) -> ServiceResult<()> {
        self.client
            .delete_stack()
            .stack_name(name)
            .client_request_token(request_token())
            .send()
            .await
            .map_err(|e| service_error("DeleteStack", &e))?;
        Ok(())
    }

    async fn describe_stack_events(&self, name: &str) -> ServiceResult<Vec<StackEvent>> {
        let events = self
            .client
            .describe_stack_events()
            .stack_name(name)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| service_error("DescribeStackEvents", &e))?;

        Ok(events.iter().filter_map(stack_event).collect())
    }

    async fn create_change_set(&self, request: &ChangeSetRequest) -> ServiceResult<String> {
        let change_set_type = match request.change_set_type {
            ChangeSetType::Create => SdkChangeSetType::Create,
            ChangeSetType::Update => SdkChangeSetType::Update,
        };

        let output = self
            .client
            .create_change_set()
            .stack_name(&request.stack_name)
            .change_set_name(&request.change_set_name)
            .template_body(&request.template_body)
            .set_parameters(Some(sdk_parameters(&request.parameters)))
            .set_capabilities(Some(capabilities()))
            .set_description(request.description.clone())
            .change_set_type(change_set_type)
            .client_token(request_token())
            .send()
            .await
            .map_err(|e| service_error("CreateChangeSet", &e))?;

        Ok(output.id().unwrap_or_default().to_string())
    }

    async fn list_change_sets(&self, stack: &str) -> ServiceResult<Vec<ChangeSetSummary>> {
        let summaries = self
            .client
            .list_change_sets()
            .stack_name(stack)
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| service_error("ListChangeSets", &e))?;

        Ok(summaries.iter().filter_map(change_set_summary).collect())
    }

    async fn describe_change_set(
        &self,
        stack: &str,
        name: &str,
    ) -> ServiceResult<ChangeSetDescription> {
        let client = &self.client;
        let pages = drain_pages(|token| {
            let request = client
                .describe_change_set()
                .stack_name(stack)
                .change_set_name(name)
                .set_next_token(token);
            async move {
                let output = request
                    .send()
                    .await
                    .map_err(|e| service_error("DescribeChangeSet", &e))?;
                let next_token = output.next_token().map(str::to_string);
                Ok(Page {
                    items: vec![output],
                    next_token,
                })
            }
        })
        .await?;

        let first = pages.first().ok_or_else(|| {
            ServiceError::new("DescribeChangeSet", None, format!("ChangeSet [{name}] does not exist"))
        })?;

        Ok(ChangeSetDescription {
            status: first
                .status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            execution_status: first
                .execution_status()
                .map(|s| s.as_str().to_string()),
            status_reason: first.status_reason().map(str::to_string),
            description: first.description().map(str::to_string),
            changes: pages
                .iter()
                .flat_map(|page| page.changes().iter().map(change))
                .collect(),
        })
    }

    async fn execute_change_set(&self, stack: &str, name: &str) -> ServiceResult<()> {
        self.client
            .execute_change_set()
            .stack_name(stack)
            .change_set_name(name)
            .client_request_token(request_token())
            .send()
            .await
            .map_err(|e| service_error("ExecuteChangeSet", &e))?;
        Ok(())
    }

    async fn delete_change_set(&self, stack: &str, name: &str) -> ServiceResult<()> {
        self.client
            .delete_change_set()
            .stack_name(stack)
            .change_set_name(name)
            .send()
            .await
            .map_err(|e| service_error("DeleteChangeSet", &e))?;
        Ok(())
    }
}
