//! Vendor and domain types
//!
//! The vendor API is lenient about which fields it populates, so most fields
//! are `Option` and decoding never fails on a missing attribute. Wire names
//! follow the vendor's camelCase convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// SESSION
// ============================================

/// Response from the form-encoded `/login/externo` endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

// ============================================
// INTAKE
// ============================================

/// A patient record as returned by `/pacientesautoage`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub codigo: u64,
    pub nome: String,
    /// CPF or equivalent document, digits only
    pub documento: Option<String>,
    pub data_nascimento: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub convenio: Option<u64>,
}

/// Payload for registering a new patient (POST `/pacientesautoage`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub nome: String,
    pub documento: String,
    pub data_nascimento: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convenio: Option<u64>,
}

/// An insurance plan (`/convenios`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insurance {
    pub codigo: u64,
    pub nome: String,
    #[serde(default)]
    pub ativo: Option<bool>,
}

/// A medical specialty (`/especialidades`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialty {
    pub codigo: u64,
    pub nome: String,
}

/// Payload for creating a check-in ticket (POST `/atendimentoboletim`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    pub paciente: u64,
    pub especialidade: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convenio: Option<u64>,
    /// Free-form triage note collected by the kiosk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
}

/// Check-in ticket returned by the vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinTicket {
    pub boletim: u64,
    /// Printable call ticket, e.g. "A042"
    pub senha: String,
    #[serde(default)]
    pub setor: Option<String>,
}

// ============================================
// QUEUE PANEL
// ============================================

/// One row on the queue display panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Call ticket shown on the panel
    pub senha: String,
    /// Counter / consulting room the patient is called to
    pub guiche: Option<String>,
    pub especialidade: Option<String>,
    /// Vendor status, e.g. "CHAMADO", "AGUARDANDO"
    pub status: Option<String>,
    pub chamado_em: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// Schema validation beyond what serde enforces: a row without a call
    /// ticket is meaningless on the panel and marks the whole payload bad.
    pub fn is_valid(&self) -> bool {
        !self.senha.trim().is_empty()
    }
}
