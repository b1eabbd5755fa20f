use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Wire strings are keyed on by external dashboards. Add new names freely, never rename.
macro_rules! telemetry_events {
    ($( $(#[$meta:meta])* $variant:ident => $wire:literal, )+) => {
        /// A trackable user-facing action.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TelemetryEvent {
            $( $(#[$meta])* $variant, )+
        }

        impl TelemetryEvent {
            pub const ALL: &'static [TelemetryEvent] = &[ $( TelemetryEvent::$variant, )+ ];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( TelemetryEvent::$variant => $wire, )+
                }
            }
        }

        impl FromStr for TelemetryEvent {
            type Err = UnknownEvent;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok(TelemetryEvent::$variant), )+
                    other => Err(UnknownEvent(other.to_string())),
                }
            }
        }
    };
}

telemetry_events! {
    // onboarding
    ConnectionStartSampleDataset => "connection_start_sample_dataset",
    ConnectionSaveDataSource => "connection_save_data_source",
    ConnectionSaveTables => "connection_save_tables",
    ConnectionSaveRelation => "connection_save_relation",

    // settings
    SettingResetProject => "setting_reset_project",
    SettingUpdateDataSource => "setting_update_data_source",

    // modeling
    ModelingDeployMdl => "modeling_deploy_mdl",
    ModelingCreateModel => "modeling_create_model",
    ModelingUpdateModel => "modeling_update_model",
    ModelingDeleteModel => "modeling_delete_model",
    ModelingUpdateModelMetadata => "modeling_update_model_metadata",
    ModelingCreateRelation => "modeling_create_relation",
    ModelingUpdateRelation => "modeling_update_relation",
    ModelingDeleteRelation => "modeling_delete_relation",
    ModelingCreateCalculatedField => "modeling_create_calculated_field",
    ModelingUpdateCalculatedField => "modeling_update_calculated_field",
    ModelingCreateView => "modeling_create_view",
    ModelingUpdateViewMetadata => "modeling_update_view_metadata",
    ModelingDetectSchemaChange => "modeling_detect_schema_change",
    ModelingResolveSchemaChange => "modeling_resolve_schema_change",

    // home
    HomeAskCandidate => "home_ask_candidate",
    HomeCreateThread => "home_create_thread",
    HomeUpdateThreadSummary => "home_update_thread_summary",
    HomeAskFollowupQuestion => "home_ask_followup_question",
    HomeCancelAsk => "home_cancel_ask",
    HomeRerunAskingTask => "home_rerun_asking_task",
    HomeGenerateProjectRecommendation => "home_generate_project_recommendation",
    HomeGenerateThreadRecommendation => "home_generate_thread_recommendation",
    HomeCreateView => "home_create_view",
    HomePreviewAnswer => "home_preview_answer",

    // knowledge
    KnowledgeCreateInstruction => "knowledge_create_instruction",
    KnowledgeUpdateInstruction => "knowledge_update_instruction",
    KnowledgeDeleteInstruction => "knowledge_delete_instruction",
    KnowledgeCreateSqlPair => "knowledge_create_sql_pair",
    KnowledgeUpdateSqlPair => "knowledge_update_sql_pair",
    KnowledgeDeleteSqlPair => "knowledge_delete_sql_pair",

    // dashboard
    DashboardCreateItem => "dashboard_create_item",
    DashboardDeleteItem => "dashboard_delete_item",
    DashboardUpdateLayout => "dashboard_update_layout",

    // engine calls issued by the backend
    IbisDryRun => "ibis_dry_run",
    IbisQuery => "ibis_query",
    /// Query engine metadata lookups.
    IbisGetTableMetadata => "ibis_get_table_metadata",
}

impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TelemetryEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TelemetryEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown telemetry event {0:?}")]
pub struct UnknownEvent(pub String);

/// The subsystem an outcome is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WrenService {
    #[serde(rename = "BE")]
    Backend,
    #[serde(rename = "AI")]
    Ai,
    #[serde(rename = "ENGINE")]
    Engine,
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl WrenService {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WrenService::Backend => "BE",
            WrenService::Ai => "AI",
            WrenService::Engine => "ENGINE",
            WrenService::Unknown => "UNKNOWN",
        }
    }

    /// Maps an attribution tag (as carried in GraphQL error extensions) to a service.
    /// Anything unrecognised is `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "BE" => WrenService::Backend,
            "AI" => WrenService::Ai,
            "ENGINE" => WrenService::Engine,
            _ => WrenService::Unknown,
        }
    }
}

impl fmt::Display for WrenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The emitted event name: the identifier suffixed by outcome.
pub fn outcome_event_name(event: TelemetryEvent, action_success: bool) -> String {
    let suffix = if action_success { "success" } else { "failed" };
    format!("{}_{}", event.as_str(), suffix)
}
