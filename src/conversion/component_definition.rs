//! ComponentDefinition v1alpha1 <-> v1
//!
//! # Rules
//! - `updateStrategy` is renamed to `updateConcurrency`
//! - component vars: `instanceNames` is renamed to `podNames`; the selector's
//!   cluster object reference is copied as is
//! - lifecycle actions: a handler with a custom exec action becomes a v1
//!   `Action` with the image and env moved into `exec`. Handlers v1 cannot
//!   express (builtin handlers, no exec) travel in the delta.
//! - role probe: the probe timeout wins over the action timeout when set
//! - `monitor`, `roleArbitrator` and the v1alpha1 switchover are delta only
//! - var names must be unique; component var refs are matched by name
//! - a v1 action without exec has no v1alpha1 form and is dropped for review

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{ConversionError, Fidelity, KindConverter};
use crate::crd::{v1, v1alpha1};

pub struct ComponentDefinitionConverter;

/// ComponentDefinition fields v1 cannot express
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentDefinitionDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<v1alpha1::MonitorConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arbitrator: Option<v1alpha1::RoleArbitrator>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_action_switchover: Option<v1alpha1::ComponentSwitchover>,

    /// Handlers without a v1 equivalent, keyed by lifecycle action name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub lifecycle_action_handlers: BTreeMap<String, v1alpha1::LifecycleActionHandler>,

    /// Set when the probe cannot be rebuilt from the v1 probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_probe: Option<v1alpha1::RoleProbe>,
}

impl KindConverter for ComponentDefinitionConverter {
    type Spoke = v1alpha1::ComponentDefinition;
    type Hub = v1::ComponentDefinition;
    type Delta = ComponentDefinitionDelta;

    const KIND: &'static str = "ComponentDefinition";

    fn map_to_hub(spoke: &v1alpha1::ComponentDefinition) -> v1::ComponentDefinition {
        let spec = &spoke.spec;
        v1::ComponentDefinition {
            metadata: ObjectMeta::default(),
            spec: v1::ComponentDefinitionSpec {
                provider: spec.provider.clone(),
                description: spec.description.clone(),
                service_kind: spec.service_kind.clone(),
                service_version: spec.service_version.clone(),
                runtime: spec.runtime.clone(),
                vars: spec
                    .vars
                    .iter()
                    .map(|var| v1::EnvVar {
                        name: var.name.clone(),
                        value: var.value.clone(),
                        value_from: var.value_from.as_ref().map(|source| v1::VarSource {
                            config_map_key_ref: source.config_map_key_ref.clone(),
                            secret_key_ref: source.secret_key_ref.clone(),
                            service_var_ref: source.service_var_ref.clone(),
                            component_var_ref: None,
                        }),
                        expression: var.expression.clone(),
                    })
                    .collect(),
                volumes: spec.volumes.clone(),
                roles: spec.roles.clone(),
                update_concurrency: None,
                lifecycle_actions: None,
                labels: spec.labels.clone(),
            },
            status: spoke.status.clone(),
        }
    }

    fn map_from_hub(hub: &v1::ComponentDefinition) -> v1alpha1::ComponentDefinition {
        let spec = &hub.spec;
        v1alpha1::ComponentDefinition {
            metadata: ObjectMeta::default(),
            spec: v1alpha1::ComponentDefinitionSpec {
                provider: spec.provider.clone(),
                description: spec.description.clone(),
                service_kind: spec.service_kind.clone(),
                service_version: spec.service_version.clone(),
                runtime: spec.runtime.clone(),
                vars: spec
                    .vars
                    .iter()
                    .map(|var| v1alpha1::EnvVar {
                        name: var.name.clone(),
                        value: var.value.clone(),
                        value_from: var.value_from.as_ref().map(|source| v1alpha1::VarSource {
                            config_map_key_ref: source.config_map_key_ref.clone(),
                            secret_key_ref: source.secret_key_ref.clone(),
                            service_var_ref: source.service_var_ref.clone(),
                            component_var_ref: None,
                        }),
                        expression: var.expression.clone(),
                    })
                    .collect(),
                volumes: spec.volumes.clone(),
                roles: spec.roles.clone(),
                role_arbitrator: None,
                update_strategy: None,
                lifecycle_actions: None,
                monitor: None,
                labels: spec.labels.clone(),
            },
            status: hub.status.clone(),
        }
    }

    fn remap_to_hub(
        spoke: &v1alpha1::ComponentDefinition,
        hub: &mut v1::ComponentDefinition,
    ) -> Result<Fidelity, ConversionError> {
        let spec = &spoke.spec;

        ensure_unique_vars(&spec.vars)?;

        hub.spec.update_concurrency = spec.update_strategy;

        for var in &spec.vars {
            let Some(selector) = var
                .value_from
                .as_ref()
                .and_then(|source| source.component_var_ref.as_ref())
            else {
                continue;
            };
            if let Some(hub_var) = hub.spec.vars.iter_mut().find(|v| v.name == var.name) {
                hub_var
                    .value_from
                    .get_or_insert_with(Default::default)
                    .component_var_ref = Some(component_var_to_hub(selector));
            }
        }

        hub.spec.lifecycle_actions = spec.lifecycle_actions.as_ref().map(lifecycle_actions_to_hub);

        Ok(Fidelity::Exact)
    }

    fn remap_from_hub(
        hub: &v1::ComponentDefinition,
        spoke: &mut v1alpha1::ComponentDefinition,
        _delta: Option<&ComponentDefinitionDelta>,
    ) -> Fidelity {
        let spec = &hub.spec;
        let mut fidelity = Fidelity::Exact;

        spoke.spec.update_strategy = spec.update_concurrency;

        // map_from_hub keeps var order
        for (var, spoke_var) in spec.vars.iter().zip(&mut spoke.spec.vars) {
            let Some(selector) = var
                .value_from
                .as_ref()
                .and_then(|source| source.component_var_ref.as_ref())
            else {
                continue;
            };
            if selector.component_vars.pod_fqdns.is_some() {
                fidelity = Fidelity::Lossy;
            }
            spoke_var
                .value_from
                .get_or_insert_with(Default::default)
                .component_var_ref = Some(component_var_from_hub(selector));
        }

        if let Some(actions) = spec.lifecycle_actions.as_ref() {
            // v1alpha1 switchover has a different shape; only the delta can
            // restore it
            if actions.switchover.is_some() || has_action_without_exec(actions) {
                fidelity = Fidelity::Lossy;
            }
            spoke.spec.lifecycle_actions = Some(lifecycle_actions_from_hub(actions));
        }

        fidelity
    }

    fn capture(spoke: &v1alpha1::ComponentDefinition) -> ComponentDefinitionDelta {
        let spec = &spoke.spec;
        let mut delta = ComponentDefinitionDelta {
            monitor: spec.monitor.clone(),
            role_arbitrator: spec.role_arbitrator,
            ..Default::default()
        };

        if let Some(actions) = spec.lifecycle_actions.as_ref() {
            delta.lifecycle_action_switchover = actions.switchover.clone();
            for (name, handler) in handlers(actions) {
                if let Some(handler) = handler {
                    if custom_exec_action(handler).is_none() {
                        delta
                            .lifecycle_action_handlers
                            .insert(name.to_string(), handler.clone());
                    }
                }
            }
            if let Some(probe) = actions.role_probe.as_ref() {
                if !probe_round_trips(probe) {
                    delta.role_probe = Some(probe.clone());
                }
            }
        }

        delta
    }

    fn apply(spoke: &mut v1alpha1::ComponentDefinition, delta: ComponentDefinitionDelta) {
        let spec = &mut spoke.spec;
        spec.monitor = delta.monitor;
        spec.role_arbitrator = delta.role_arbitrator;

        let needs_actions = delta.lifecycle_action_switchover.is_some()
            || delta.role_probe.is_some()
            || !delta.lifecycle_action_handlers.is_empty();
        if spec.lifecycle_actions.is_none() && !needs_actions {
            return;
        }

        let actions = spec.lifecycle_actions.get_or_insert_with(Default::default);
        actions.switchover = delta.lifecycle_action_switchover;
        if let Some(probe) = delta.role_probe {
            actions.role_probe = Some(probe);
        }
        for (name, handler) in delta.lifecycle_action_handlers {
            if let Some(slot) = handler_slot_mut(actions, &name) {
                *slot = Some(handler);
            }
        }
    }
}

/// Lifecycle action names shared by both versions, in declaration order
const HANDLER_NAMES: [&str; 10] = [
    "postProvision",
    "preTerminate",
    "memberJoin",
    "memberLeave",
    "readonly",
    "readwrite",
    "dataDump",
    "dataLoad",
    "reconfigure",
    "accountProvision",
];

fn handlers(
    actions: &v1alpha1::ComponentLifecycleActions,
) -> [(&'static str, Option<&v1alpha1::LifecycleActionHandler>); 10] {
    [
        (HANDLER_NAMES[0], actions.post_provision.as_ref()),
        (HANDLER_NAMES[1], actions.pre_terminate.as_ref()),
        (HANDLER_NAMES[2], actions.member_join.as_ref()),
        (HANDLER_NAMES[3], actions.member_leave.as_ref()),
        (HANDLER_NAMES[4], actions.readonly.as_ref()),
        (HANDLER_NAMES[5], actions.readwrite.as_ref()),
        (HANDLER_NAMES[6], actions.data_dump.as_ref()),
        (HANDLER_NAMES[7], actions.data_load.as_ref()),
        (HANDLER_NAMES[8], actions.reconfigure.as_ref()),
        (HANDLER_NAMES[9], actions.account_provision.as_ref()),
    ]
}

fn handler_slot_mut<'a>(
    actions: &'a mut v1alpha1::ComponentLifecycleActions,
    name: &str,
) -> Option<&'a mut Option<v1alpha1::LifecycleActionHandler>> {
    match name {
        "postProvision" => Some(&mut actions.post_provision),
        "preTerminate" => Some(&mut actions.pre_terminate),
        "memberJoin" => Some(&mut actions.member_join),
        "memberLeave" => Some(&mut actions.member_leave),
        "readonly" => Some(&mut actions.readonly),
        "readwrite" => Some(&mut actions.readwrite),
        "dataDump" => Some(&mut actions.data_dump),
        "dataLoad" => Some(&mut actions.data_load),
        "reconfigure" => Some(&mut actions.reconfigure),
        "accountProvision" => Some(&mut actions.account_provision),
        _ => None,
    }
}

fn ensure_unique_vars(vars: &[v1alpha1::EnvVar]) -> Result<(), ConversionError> {
    let mut seen = BTreeSet::new();
    for var in vars {
        if !seen.insert(var.name.as_str()) {
            return Err(ConversionError::DuplicateName {
                field: "vars",
                name: var.name.clone(),
            });
        }
    }
    Ok(())
}

/// Any v1 action, role probe included, that carries no exec
fn has_action_without_exec(actions: &v1::ComponentLifecycleActions) -> bool {
    [
        actions.post_provision.as_ref(),
        actions.pre_terminate.as_ref(),
        actions.role_probe.as_ref().map(|probe| &probe.action),
        actions.member_join.as_ref(),
        actions.member_leave.as_ref(),
        actions.readonly.as_ref(),
        actions.readwrite.as_ref(),
        actions.data_dump.as_ref(),
        actions.data_load.as_ref(),
        actions.reconfigure.as_ref(),
        actions.account_provision.as_ref(),
    ]
    .into_iter()
    .flatten()
    .any(|action| action.exec.is_none())
}

fn component_var_to_hub(selector: &v1alpha1::ComponentVarSelector) -> v1::ComponentVarSelector {
    v1::ComponentVarSelector {
        cluster_object_reference: selector.cluster_object_reference.clone(),
        component_vars: v1::ComponentVars {
            component_name: selector.component_vars.component_name,
            replicas: selector.component_vars.replicas,
            pod_names: selector.component_vars.instance_names,
            pod_fqdns: None,
        },
    }
}

fn component_var_from_hub(selector: &v1::ComponentVarSelector) -> v1alpha1::ComponentVarSelector {
    v1alpha1::ComponentVarSelector {
        cluster_object_reference: selector.cluster_object_reference.clone(),
        component_vars: v1alpha1::ComponentVars {
            component_name: selector.component_vars.component_name,
            replicas: selector.component_vars.replicas,
            instance_names: selector.component_vars.pod_names,
        },
    }
}

/// The custom action of a handler v1 can represent exactly
///
/// v1 has no builtin handlers and every v1 action runs an exec.
fn custom_exec_action(handler: &v1alpha1::LifecycleActionHandler) -> Option<&v1alpha1::Action> {
    if handler.builtin_handler.is_some() {
        return None;
    }
    handler.custom_handler.as_ref().filter(|a| a.exec.is_some())
}

/// A v1 probe carries a single timeout; the probe survives a round trip only
/// when both v1alpha1 timeouts agree
fn probe_round_trips(probe: &v1alpha1::RoleProbe) -> bool {
    custom_exec_action(&probe.handler)
        .is_some_and(|action| action.timeout_seconds == probe.timeout_seconds)
}

fn handler_to_hub(handler: &v1alpha1::LifecycleActionHandler) -> Option<v1::Action> {
    let action = handler.custom_handler.as_ref()?;
    let exec = action.exec.as_ref()?;
    Some(v1::Action {
        exec: Some(v1::ExecAction {
            image: action.image.clone(),
            env: action.env.clone(),
            command: exec.command.clone(),
            args: exec.args.clone(),
            target_pod_selector: action.target_pod_selector,
            matching_key: action.matching_key.clone(),
            container: action.container.clone(),
        }),
        timeout_seconds: action.timeout_seconds,
        retry_policy: action.retry_policy.clone(),
        pre_condition: action.pre_condition,
    })
}

fn handler_from_hub(action: &v1::Action) -> Option<v1alpha1::LifecycleActionHandler> {
    let exec = action.exec.as_ref()?;
    Some(v1alpha1::LifecycleActionHandler {
        builtin_handler: None,
        custom_handler: Some(v1alpha1::Action {
            image: exec.image.clone(),
            exec: Some(v1alpha1::ExecAction {
                command: exec.command.clone(),
                args: exec.args.clone(),
            }),
            env: exec.env.clone(),
            target_pod_selector: exec.target_pod_selector,
            matching_key: exec.matching_key.clone(),
            container: exec.container.clone(),
            timeout_seconds: action.timeout_seconds,
            retry_policy: action.retry_policy.clone(),
            pre_condition: action.pre_condition,
        }),
    })
}

fn probe_to_hub(probe: &v1alpha1::RoleProbe) -> Option<v1::Probe> {
    let mut action = handler_to_hub(&probe.handler)?;
    if probe.timeout_seconds > 0 {
        action.timeout_seconds = probe.timeout_seconds;
    }
    Some(v1::Probe {
        action,
        initial_delay_seconds: probe.initial_delay_seconds,
        period_seconds: probe.period_seconds,
    })
}

fn probe_from_hub(probe: &v1::Probe) -> Option<v1alpha1::RoleProbe> {
    Some(v1alpha1::RoleProbe {
        handler: handler_from_hub(&probe.action)?,
        initial_delay_seconds: probe.initial_delay_seconds,
        timeout_seconds: probe.action.timeout_seconds,
        period_seconds: probe.period_seconds,
    })
}

fn lifecycle_actions_to_hub(
    actions: &v1alpha1::ComponentLifecycleActions,
) -> v1::ComponentLifecycleActions {
    let convert = |handler: &Option<v1alpha1::LifecycleActionHandler>| {
        handler.as_ref().and_then(handler_to_hub)
    };
    v1::ComponentLifecycleActions {
        post_provision: convert(&actions.post_provision),
        pre_terminate: convert(&actions.pre_terminate),
        role_probe: actions.role_probe.as_ref().and_then(probe_to_hub),
        switchover: None,
        member_join: convert(&actions.member_join),
        member_leave: convert(&actions.member_leave),
        readonly: convert(&actions.readonly),
        readwrite: convert(&actions.readwrite),
        data_dump: convert(&actions.data_dump),
        data_load: convert(&actions.data_load),
        reconfigure: convert(&actions.reconfigure),
        account_provision: convert(&actions.account_provision),
    }
}

fn lifecycle_actions_from_hub(
    actions: &v1::ComponentLifecycleActions,
) -> v1alpha1::ComponentLifecycleActions {
    let convert = |action: &Option<v1::Action>| action.as_ref().and_then(handler_from_hub);
    v1alpha1::ComponentLifecycleActions {
        post_provision: convert(&actions.post_provision),
        pre_terminate: convert(&actions.pre_terminate),
        role_probe: actions.role_probe.as_ref().and_then(probe_from_hub),
        switchover: None,
        member_join: convert(&actions.member_join),
        member_leave: convert(&actions.member_leave),
        readonly: convert(&actions.readonly),
        readwrite: convert(&actions.readwrite),
        data_dump: convert(&actions.data_dump),
        data_load: convert(&actions.data_load),
        reconfigure: convert(&actions.reconfigure),
        account_provision: convert(&actions.account_provision),
    }
}

#[cfg(test)]
#[path = "component_definition_test.rs"]
mod tests;
