//! Voice Call Orchestration API Library
//!
//! Core functionality for the voice call orchestrator: the Twilio webhook
//! state machine, conversation turn engine, scheduling/booking, call context
//! resolution, and the persistence seam.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `conversation`: Conversation turn engine.
//! - `directive`: Embedded model directive parsing.
//! - `email_client`: Transactional email client.
//! - `errors`: Error handling types.
//! - `models`: Core data models.
//! - `openai_client`: Generative text service client.
//! - `resolver`: Inbound call context resolution.
//! - `scheduling`: Slot computation and booking execution.
//! - `store`: Persistence traits, Postgres and in-memory backends.
//! - `summary`: Post-call summary generation.
//! - `twilio_client`: Telephony REST client.
//! - `twiml`: TwiML response construction.
//! - `webhook_handler`: Voice webhook event router.
//! - `webhook_models`: Webhook query/form models.

pub mod config;
pub mod conversation;
pub mod directive;
pub mod email_client;
pub mod errors;
pub mod models;
pub mod openai_client;
pub mod resolver;
pub mod scheduling;
pub mod store;
pub mod summary;
pub mod twilio_client;
pub mod twiml;
pub mod webhook_handler;
pub mod webhook_models;
