//! SeaORM entity models
//!
//! One module per table, with aliased re-exports for ergonomic use from
//! the repository layer.

mod account;
mod address;
mod client;
mod communication;
mod contact;
mod document;
mod lead;
mod opportunity;
mod pipeline;
mod pipeline_status;
mod quote;
mod telephony_token;
mod user;
mod workspace;

pub use account::{
    ActiveModel as AccountActiveModel, Column as AccountColumn, Entity as AccountEntity,
    Model as Account,
};

pub use address::{
    ActiveModel as AddressActiveModel, Column as AddressColumn, Entity as AddressEntity,
    Model as Address,
};

pub use client::{
    ActiveModel as ClientActiveModel, Column as ClientColumn, Entity as ClientEntity,
    Model as Client, CLIENT_TYPES,
};

pub use communication::{
    ActiveModel as CommunicationActiveModel, Column as CommunicationColumn,
    Entity as CommunicationEntity, Model as Communication, COMM_DIRECTIONS, COMM_TYPES,
};

pub use contact::{
    ActiveModel as ContactActiveModel, Column as ContactColumn, Entity as ContactEntity,
    Model as Contact, LIFECYCLE_STAGES,
};

pub use document::{
    ActiveModel as DocumentActiveModel, Column as DocumentColumn, Entity as DocumentEntity,
    Model as Document, DOCUMENT_ENTITY_TYPES,
};

pub use lead::{
    ActiveModel as LeadActiveModel, Column as LeadColumn, Entity as LeadEntity, Model as Lead,
    INSURANCE_TYPES,
};

pub use opportunity::{
    ActiveModel as OpportunityActiveModel, Column as OpportunityColumn,
    Entity as OpportunityEntity, Model as Opportunity, BUSINESS_STAGES, PERSONAL_STAGES,
};

pub use pipeline::{
    ActiveModel as PipelineActiveModel, Column as PipelineColumn, Entity as PipelineEntity,
    Model as Pipeline,
};

pub use pipeline_status::{
    ActiveModel as PipelineStatusActiveModel, Column as PipelineStatusColumn,
    Entity as PipelineStatusEntity, Model as PipelineStatus,
};

pub use quote::{
    ActiveModel as QuoteActiveModel, Column as QuoteColumn, Entity as QuoteEntity, Model as Quote,
    CONTRACT_TERMS,
};

pub use telephony_token::{
    ActiveModel as TelephonyTokenActiveModel, Column as TelephonyTokenColumn,
    Entity as TelephonyTokenEntity, Model as TelephonyToken,
};

pub use user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as UserEntity, Model as User,
};

pub use workspace::{
    ActiveModel as WorkspaceActiveModel, Column as WorkspaceColumn, Entity as WorkspaceEntity,
    Model as Workspace,
};
