// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

/// The browse screens. Each one is the same engine over a different preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Claims,
    Patients,
    Payments,
    Adjustments,
    Disbursements,
    Payers,
    Physicians,
    Services,
    ClaimNotes,
}

impl EntityKind {
    pub const ALL: [Self; 9] = [
        Self::Claims,
        Self::Patients,
        Self::Payments,
        Self::Adjustments,
        Self::Disbursements,
        Self::Payers,
        Self::Physicians,
        Self::Services,
        Self::ClaimNotes,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Claims => "claims",
            Self::Patients => "patients",
            Self::Payments => "payments",
            Self::Adjustments => "adjustments",
            Self::Disbursements => "disbursements",
            Self::Payers => "payers",
            Self::Physicians => "physicians",
            Self::Services => "services",
            Self::ClaimNotes => "claim_notes",
        }
    }

    /// Accepts the canonical name plus `-` and space spellings of it.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "claims" => Some(Self::Claims),
            "patients" => Some(Self::Patients),
            "payments" => Some(Self::Payments),
            "adjustments" => Some(Self::Adjustments),
            "disbursements" => Some(Self::Disbursements),
            "payers" => Some(Self::Payers),
            "physicians" => Some(Self::Physicians),
            "services" => Some(Self::Services),
            "claim_notes" | "notes" => Some(Self::ClaimNotes),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Claims => "Claims",
            Self::Patients => "Patients",
            Self::Payments => "Payments",
            Self::Adjustments => "Adjustments",
            Self::Disbursements => "Disbursements",
            Self::Payers => "Payers",
            Self::Physicians => "Physicians",
            Self::Services => "Services",
            Self::ClaimNotes => "Claim notes",
        }
    }

    /// Resource path under the server base URL.
    pub const fn api_path(self) -> &'static str {
        match self {
            Self::Claims => "claims",
            Self::Patients => "patients",
            Self::Payments => "payments",
            Self::Adjustments => "adjustments",
            Self::Disbursements => "disbursements",
            Self::Payers => "payers",
            Self::Physicians => "physicians",
            Self::Services => "services",
            Self::ClaimNotes => "claim-notes",
        }
    }
}
