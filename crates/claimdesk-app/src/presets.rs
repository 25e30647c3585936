// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Seed columns and server mappings for each browse screen.

use crate::entities::EntityKind;
use crate::model::{ColumnDefinition, DataType};
use crate::query::{MappingTable, ServerParam, ServerRule};

/// Everything a browse screen needs that differs between entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset<P> {
    pub entity: EntityKind,
    pub columns: Vec<ColumnDefinition>,
    pub mappings: MappingTable<P>,
}

/// Links a parameter enum to the preset of its entity.
pub trait EntityParams: ServerParam {
    const ENTITY: EntityKind;

    fn preset() -> Preset<Self>;
}

crate::server_params! {
    pub enum ClaimParam {
        MinClaimId => "minClaimId",
        MaxClaimId => "maxClaimId",
        StatusList => "statusList",
        MinBilledAmount => "minBilledAmount",
        MaxBilledAmount => "maxBilledAmount",
        PatientName => "patientName",
    }
}

crate::server_params! {
    pub enum PatientParam {
        MinPatientId => "minPatientId",
        MaxPatientId => "maxPatientId",
        LastName => "lastName",
        GenderList => "genderList",
    }
}

crate::server_params! {
    pub enum PaymentParam {
        MinPaymentId => "minPaymentId",
        MaxPaymentId => "maxPaymentId",
        MethodList => "methodList",
        MinAmount => "minAmount",
        MaxAmount => "maxAmount",
    }
}

crate::server_params! {
    pub enum AdjustmentParam {
        MinAdjustmentId => "minAdjustmentId",
        MaxAdjustmentId => "maxAdjustmentId",
        ReasonList => "reasonList",
        MinAmount => "minAmount",
        MaxAmount => "maxAmount",
    }
}

crate::server_params! {
    pub enum DisbursementParam {
        MinDisbursementId => "minDisbursementId",
        MaxDisbursementId => "maxDisbursementId",
        StatusList => "statusList",
        Payee => "payee",
        MinAmount => "minAmount",
        MaxAmount => "maxAmount",
    }
}

crate::server_params! {
    pub enum PayerParam {
        MinPayerId => "minPayerId",
        MaxPayerId => "maxPayerId",
        Name => "name",
        TypeList => "typeList",
        ActiveList => "activeList",
    }
}

crate::server_params! {
    pub enum PhysicianParam {
        MinPhysicianId => "minPhysicianId",
        MaxPhysicianId => "maxPhysicianId",
        LastName => "lastName",
        SpecialtyList => "specialtyList",
    }
}

crate::server_params! {
    pub enum ServiceParam {
        MinServiceId => "minServiceId",
        MaxServiceId => "maxServiceId",
        Code => "code",
        CategoryList => "categoryList",
        MinFee => "minFee",
        MaxFee => "maxFee",
    }
}

crate::server_params! {
    pub enum ClaimNoteParam {
        MinNoteId => "minNoteId",
        MaxNoteId => "maxNoteId",
        MinClaimId => "minClaimId",
        MaxClaimId => "maxClaimId",
        AuthorList => "authorList",
    }
}

fn native(key: &str, label: &str, data_type: DataType) -> ColumnDefinition {
    ColumnDefinition::native(key, label, data_type)
}

impl EntityParams for ClaimParam {
    const ENTITY: EntityKind = EntityKind::Claims;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("claID", "Claim ID", DataType::Number),
                native("claStatus", "Status", DataType::String),
                native("claClassification", "Classification", DataType::String),
                native("claPatientName", "Patient", DataType::String),
                native("claDateOfService", "Service date", DataType::Date),
                native("claBilledAmount", "Billed", DataType::Currency),
                native("claSubmittedAt", "Submitted", DataType::Datetime).hidden(),
            ],
            mappings: MappingTable::new()
                .with(
                    "claID",
                    ServerRule::range(Self::MinClaimId, Self::MaxClaimId),
                )
                .with("claStatus", ServerRule::list(Self::StatusList))
                .with(
                    "claBilledAmount",
                    ServerRule::range(Self::MinBilledAmount, Self::MaxBilledAmount),
                )
                .with("claPatientName", ServerRule::text(Self::PatientName)),
        }
    }
}

impl EntityParams for PatientParam {
    const ENTITY: EntityKind = EntityKind::Patients;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("patID", "Patient ID", DataType::Number),
                native("patLastName", "Last name", DataType::String),
                native("patFirstName", "First name", DataType::String),
                native("patGender", "Gender", DataType::String),
                native("patDateOfBirth", "Birth date", DataType::Date),
                native("patActive", "Active", DataType::Boolean),
            ],
            mappings: MappingTable::new()
                .with(
                    "patID",
                    ServerRule::range(Self::MinPatientId, Self::MaxPatientId),
                )
                .with("patLastName", ServerRule::text(Self::LastName))
                .with("patGender", ServerRule::list(Self::GenderList)),
        }
    }
}

impl EntityParams for PaymentParam {
    const ENTITY: EntityKind = EntityKind::Payments;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("pmtID", "Payment ID", DataType::Number),
                native("pmtDate", "Received", DataType::Date),
                native("pmtMethod", "Method", DataType::String),
                native("pmtAmount", "Amount", DataType::Currency),
                native("pmtReference", "Reference", DataType::String),
            ],
            mappings: MappingTable::new()
                .with(
                    "pmtID",
                    ServerRule::range(Self::MinPaymentId, Self::MaxPaymentId),
                )
                .with("pmtMethod", ServerRule::list(Self::MethodList))
                .with("pmtAmount", ServerRule::range(Self::MinAmount, Self::MaxAmount)),
        }
    }
}

impl EntityParams for AdjustmentParam {
    const ENTITY: EntityKind = EntityKind::Adjustments;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("adjID", "Adjustment ID", DataType::Number),
                native("adjDate", "Posted", DataType::Date),
                native("adjReason", "Reason", DataType::String),
                native("adjAmount", "Amount", DataType::Currency),
                native("adjNote", "Note", DataType::String),
            ],
            mappings: MappingTable::new()
                .with(
                    "adjID",
                    ServerRule::range(Self::MinAdjustmentId, Self::MaxAdjustmentId),
                )
                .with("adjReason", ServerRule::list(Self::ReasonList))
                .with("adjAmount", ServerRule::range(Self::MinAmount, Self::MaxAmount)),
        }
    }
}

impl EntityParams for DisbursementParam {
    const ENTITY: EntityKind = EntityKind::Disbursements;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("dsbID", "Disbursement ID", DataType::Number),
                native("dsbDate", "Issued", DataType::Date),
                native("dsbPayee", "Payee", DataType::String),
                native("dsbStatus", "Status", DataType::String),
                native("dsbAmount", "Amount", DataType::Currency),
            ],
            mappings: MappingTable::new()
                .with(
                    "dsbID",
                    ServerRule::range(Self::MinDisbursementId, Self::MaxDisbursementId),
                )
                .with("dsbPayee", ServerRule::text(Self::Payee))
                .with("dsbStatus", ServerRule::list(Self::StatusList))
                .with("dsbAmount", ServerRule::range(Self::MinAmount, Self::MaxAmount)),
        }
    }
}

impl EntityParams for PayerParam {
    const ENTITY: EntityKind = EntityKind::Payers;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("pyrID", "Payer ID", DataType::Number),
                native("pyrName", "Name", DataType::String),
                native("pyrType", "Type", DataType::String),
                native("pyrPhone", "Phone", DataType::String),
                native("pyrActive", "Active", DataType::Boolean),
            ],
            mappings: MappingTable::new()
                .with("pyrID", ServerRule::range(Self::MinPayerId, Self::MaxPayerId))
                .with("pyrName", ServerRule::text(Self::Name))
                .with("pyrType", ServerRule::list(Self::TypeList))
                // The payer endpoint reads an empty active list as "match nothing".
                .with("pyrActive", ServerRule::list_or_empty(Self::ActiveList)),
        }
    }
}

impl EntityParams for PhysicianParam {
    const ENTITY: EntityKind = EntityKind::Physicians;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("phyID", "Physician ID", DataType::Number),
                native("phyLastName", "Last name", DataType::String),
                native("phyFirstName", "First name", DataType::String),
                native("phySpecialty", "Specialty", DataType::String),
                native("phyNpi", "NPI", DataType::String),
            ],
            mappings: MappingTable::new()
                .with(
                    "phyID",
                    ServerRule::range(Self::MinPhysicianId, Self::MaxPhysicianId),
                )
                .with("phyLastName", ServerRule::text(Self::LastName))
                .with("phySpecialty", ServerRule::list(Self::SpecialtyList)),
        }
    }
}

impl EntityParams for ServiceParam {
    const ENTITY: EntityKind = EntityKind::Services;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("svcID", "Service ID", DataType::Number),
                native("svcCode", "Code", DataType::String),
                native("svcDescription", "Description", DataType::String),
                native("svcCategory", "Category", DataType::String),
                native("svcFee", "Fee", DataType::Currency),
            ],
            mappings: MappingTable::new()
                .with(
                    "svcID",
                    ServerRule::range(Self::MinServiceId, Self::MaxServiceId),
                )
                .with("svcCode", ServerRule::text(Self::Code))
                .with("svcCategory", ServerRule::list(Self::CategoryList))
                .with("svcFee", ServerRule::range(Self::MinFee, Self::MaxFee)),
        }
    }
}

impl EntityParams for ClaimNoteParam {
    const ENTITY: EntityKind = EntityKind::ClaimNotes;

    fn preset() -> Preset<Self> {
        Preset {
            entity: Self::ENTITY,
            columns: vec![
                native("clnID", "Note ID", DataType::Number),
                native("clnClaimID", "Claim ID", DataType::Number),
                native("clnAuthor", "Author", DataType::String),
                native("clnCreatedAt", "Created", DataType::Datetime),
                native("clnBody", "Note", DataType::String),
            ],
            mappings: MappingTable::new()
                .with("clnID", ServerRule::range(Self::MinNoteId, Self::MaxNoteId))
                .with(
                    "clnClaimID",
                    ServerRule::range(Self::MinClaimId, Self::MaxClaimId),
                )
                .with("clnAuthor", ServerRule::list(Self::AuthorList)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AdjustmentParam, ClaimNoteParam, ClaimParam, DisbursementParam, EntityParams,
        PatientParam, PayerParam, PaymentParam, PhysicianParam, ServiceParam,
    };
    use crate::entities::EntityKind;
    use crate::query::{RESERVED_PARAMS, ServerParam, ServerRule};
    use std::collections::BTreeSet;

    fn check<P: EntityParams>(all: &[P]) {
        let preset = P::preset();
        assert_eq!(preset.entity, P::ENTITY);

        let names = all.iter().map(|param| param.name()).collect::<BTreeSet<_>>();
        assert_eq!(names.len(), all.len(), "{} has duplicate wire names", P::ENTITY.as_str());
        for reserved in RESERVED_PARAMS {
            assert!(!names.contains(&reserved), "{reserved} is reserved");
        }

        let keys = preset
            .columns
            .iter()
            .map(|column| column.key.as_str())
            .collect::<BTreeSet<_>>();
        assert_eq!(keys.len(), preset.columns.len());
        for key in preset.mappings.columns() {
            assert!(keys.contains(key), "mapping for unknown column {key}");
            let column = preset.columns.iter().find(|column| column.key == key);
            if let (Some(column), Some(ServerRule::Range { .. })) =
                (column, preset.mappings.rule(key))
            {
                assert!(column.data_type.is_numeric(), "{key} range on non-numeric column");
            }
        }
        assert_eq!(preset.mappings.params().len(), all.len());
    }

    #[test]
    fn every_preset_is_consistent() {
        check(ClaimParam::ALL);
        check(PatientParam::ALL);
        check(PaymentParam::ALL);
        check(AdjustmentParam::ALL);
        check(DisbursementParam::ALL);
        check(PayerParam::ALL);
        check(PhysicianParam::ALL);
        check(ServiceParam::ALL);
        check(ClaimNoteParam::ALL);
    }

    #[test]
    fn presets_cover_every_entity() {
        let covered = [
            ClaimParam::ENTITY,
            PatientParam::ENTITY,
            PaymentParam::ENTITY,
            AdjustmentParam::ENTITY,
            DisbursementParam::ENTITY,
            PayerParam::ENTITY,
            PhysicianParam::ENTITY,
            ServiceParam::ENTITY,
            ClaimNoteParam::ENTITY,
        ];
        assert_eq!(covered, EntityKind::ALL);
    }

    #[test]
    fn claims_preset_maps_id_and_status_but_not_classification() {
        let preset = ClaimParam::preset();
        assert_eq!(
            preset.mappings.rule("claID"),
            Some(&ServerRule::range(ClaimParam::MinClaimId, ClaimParam::MaxClaimId))
        );
        assert_eq!(
            preset.mappings.rule("claStatus"),
            Some(&ServerRule::list(ClaimParam::StatusList))
        );
        assert_eq!(preset.mappings.rule("claClassification"), None);
    }
}
