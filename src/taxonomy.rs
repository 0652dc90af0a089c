//! Event taxonomy: the semantic vocabulary of tracked events
//!
//! Each namespace (`device`, `application`, ...) lists the actions that can
//! happen to it. For every pair a typed method is generated on a per-namespace
//! accessor, so `log.device().rename(data, context)` tracks an event labelled
//! `"Device Rename"`. The same table backs the dynamic
//! `EventLog::track_action`.

use crate::error::Result;
use crate::event_log::EventLog;
use crate::types::Context;

macro_rules! event_taxonomy {
    (
        $(
            $namespace:literal => $accessor:ident / $events:ident {
                $( $method:ident => $action:literal ),* $(,)?
            }
        )*
    ) => {
        /// Every namespace with its actions, in declaration order
        pub const EVENTS: &[(&str, &[&str])] = &[
            $( ($namespace, &[ $( $action ),* ]) ),*
        ];

        $(
            #[doc = concat!("Typed tracking methods of the `", $namespace, "` namespace")]
            #[derive(Clone, Copy)]
            pub struct $events<'a> {
                log: &'a EventLog,
            }

            impl<'a> $events<'a> {
                /// Namespace these methods track under
                pub const NAMESPACE: &'static str = $namespace;

                $(
                    #[doc = concat!("Track `", $namespace, ".", $action, "`")]
                    pub async fn $method(
                        &self,
                        json_data: Option<serde_json::Value>,
                        context: Option<Context>,
                    ) -> Result<()> {
                        self.log
                            .create_taxonomy_event($namespace, $action, json_data, context)
                            .await
                    }
                )*
            }
        )*

        impl EventLog {
            $(
                #[doc = concat!("Events of the `", $namespace, "` namespace")]
                pub fn $accessor(&self) -> $events<'_> {
                    $events { log: self }
                }
            )*
        }
    };
}

event_taxonomy! {
    "user" => user / UserEvents {
        login => "login",
        logout => "logout",
        signup => "signup",
        password_create => "passwordCreate",
        password_edit => "passwordEdit",
        email_edit => "emailEdit",
        username_edit => "usernameEdit",
        delete => "delete",
    }
    "apiKey" => api_key / ApiKeyEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "publicKey" => public_key / PublicKeyEvents {
        create => "create",
        delete => "delete",
    }
    "application" => application / ApplicationEvents {
        create => "create",
        open => "open",
        os_download => "osDownload",
        os_config_download => "osConfigDownload",
        public_url_enable => "publicUrlEnable",
        public_url_disable => "publicUrlDisable",
        restart => "restart",
        support_access_enable => "supportAccessEnable",
        support_access_disable => "supportAccessDisable",
        purge => "purge",
        reboot => "reboot",
        shutdown => "shutdown",
        application_type_change => "applicationTypeChange",
        delete => "delete",
        pin_to_release => "pinToRelease",
    }
    "applicationTag" => application_tag / ApplicationTagEvents {
        set => "set",
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "applicationMembers" => application_members / ApplicationMembersEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "configVariable" => config_variable / ConfigVariableEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "environmentVariable" => environment_variable / EnvironmentVariableEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "serviceVariable" => service_variable / ServiceVariableEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "device" => device / DeviceEvents {
        open => "open",
        rename => "rename",
        terminal_open => "terminalOpen",
        terminal_close => "terminalClose",
        public_url_enable => "publicUrlEnable",
        public_url_disable => "publicUrlDisable",
        lock_override_enable => "lockOverrideEnable",
        lock_override_disable => "lockOverrideDisable",
        restart => "restart",
        r#move => "move",
        host_os_update => "hostOsUpdate",
        host_os_update_hide => "hostOsUpdateHide",
        host_os_update_failed => "hostOsUpdateFailed",
        host_os_update_succeeded => "hostOsUpdateSucceeded",
        local_mode_enable => "localModeEnable",
        local_mode_disable => "localModeDisable",
        support_access_enable => "supportAccessEnable",
        support_access_disable => "supportAccessDisable",
        purge => "purge",
        reboot => "reboot",
        shutdown => "shutdown",
        delete => "delete",
        deactivate => "deactivate",
        pin_to_release => "pinToRelease",
        diagnostics_download => "diagnosticsDownload",
        diagnostics_open => "diagnosticsOpen",
        diagnostics_run => "diagnosticsRun",
        health_checks_open => "healthChecksOpen",
        health_checks_run => "healthChecksRun",
        supervisor_state_open => "supervisorStateOpen",
    }
    "release" => release / ReleaseEvents {
        add_release_open => "addReleaseOpen",
        instructions_copy => "instructionsCopy",
        install_link_click => "installLinkClick",
        getting_started_click => "gettingStartedClick",
        deploy_from_url => "deployFromUrl",
    }
    "deviceConfigVariable" => device_config_variable / DeviceConfigVariableEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "deviceEnvironmentVariable" => device_environment_variable / DeviceEnvironmentVariableEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "deviceServiceVariable" => device_service_variable / DeviceServiceVariableEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "deviceTag" => device_tag / DeviceTagEvents {
        set => "set",
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "releaseTag" => release_tag / ReleaseTagEvents {
        set => "set",
        create => "create",
        edit => "edit",
        delete => "delete",
    }
    "billing" => billing / BillingEvents {
        payment_info_update => "paymentInfoUpdate",
        plan_change => "planChange",
        invoice_download => "invoiceDownload",
    }
    "onboarding" => onboarding / OnboardingEvents {
        step_click => "stepClick",
        what_next_item_click => "whatNextItemClick",
    }
    "gettingStartedGuide" => getting_started_guide / GettingStartedGuideEvents {
        modal_show => "modalShow",
        modal_hide => "modalHide",
        modal_skip => "modalSkip",
        modal_guide_open => "modalGuideOpen",
    }
    "page" => page / PageEvents {
        visit => "visit",
    }
    "navigation" => navigation / NavigationEvents {
        click => "click",
    }
    "members" => members / MembersEvents {
        create => "create",
        edit => "edit",
        delete => "delete",
        invite => "invite",
    }
    "deployToBalena" => deploy_to_balena / DeployToBalenaEvents {
        open => "open",
        cancel => "cancel",
    }
    "invite" => invite / InviteEvents {
        add_invite_open => "addInviteOpen",
        create => "create",
        delete => "delete",
        accept => "accept",
    }
}

/// Public aliases of namespaces: `(alias, namespace)`
///
/// Aliases return the very same accessor as their target and track under
/// the target's labels.
pub const ALIASES: &[(&str, &str)] = &[
    ("fleet", "application"),
    ("fleetTag", "applicationTag"),
    ("fleetMembers", "applicationMembers"),
];

impl EventLog {
    /// Alias of [`EventLog::application`]
    pub fn fleet(&self) -> ApplicationEvents<'_> {
        self.application()
    }

    /// Alias of [`EventLog::application_tag`]
    pub fn fleet_tag(&self) -> ApplicationTagEvents<'_> {
        self.application_tag()
    }

    /// Alias of [`EventLog::application_members`]
    pub fn fleet_members(&self) -> ApplicationMembersEvents<'_> {
        self.application_members()
    }
}

/// Resolve a namespace or alias to its canonical namespace
pub fn resolve_namespace(name: &str) -> Option<&'static str> {
    EVENTS
        .iter()
        .map(|(namespace, _)| *namespace)
        .find(|namespace| *namespace == name)
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == name)
                .map(|(_, namespace)| *namespace)
        })
}

/// Actions of a namespace (aliases resolved)
pub fn actions(namespace: &str) -> Option<&'static [&'static str]> {
    let namespace = resolve_namespace(namespace)?;
    EVENTS
        .iter()
        .find(|(n, _)| *n == namespace)
        .map(|(_, actions)| *actions)
}

/// Display label of a namespace/action pair, if it is part of the taxonomy
pub fn lookup(namespace: &str, action: &str) -> Option<String> {
    let canonical = resolve_namespace(namespace)?;
    actions(canonical)?
        .iter()
        .any(|a| *a == action)
        .then(|| label(canonical, action))
}

/// Display label of a namespace/action pair: `"device hostOsUpdate"` →
/// `"Device Host Os Update"`
pub fn label(namespace: &str, action: &str) -> String {
    start_case(&format!("{} {}", namespace, action))
}

/// Every `(namespace, action, label)` triple of the taxonomy
pub fn labels() -> impl Iterator<Item = (&'static str, &'static str, String)> {
    EVENTS.iter().flat_map(|(namespace, actions)| {
        actions
            .iter()
            .map(move |action| (*namespace, *action, label(namespace, action)))
    })
}

/// Split into words on separators and case changes, then capitalize each
/// word: `"apiKey create"` → `"Api Key Create"`, `"publicURL"` → `"Public URL"`
pub fn start_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let lower_to_upper = !prev.is_uppercase() && c.is_uppercase();
            let acronym_end = prev.is_uppercase()
                && c.is_uppercase()
                && next.is_some_and(|n| n.is_lowercase());
            if lower_to_upper || acronym_end {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_case() {
        assert_eq!(start_case("device rename"), "Device Rename");
        assert_eq!(start_case("apiKey create"), "Api Key Create");
        assert_eq!(start_case("device hostOsUpdate"), "Device Host Os Update");
        assert_eq!(start_case("publicURL"), "Public URL");
        assert_eq!(start_case("  user--login "), "User Login");
        assert_eq!(start_case(""), "");
    }

    #[test]
    fn test_taxonomy_shape() {
        assert_eq!(EVENTS.len(), 24);
        assert_eq!(actions("device").unwrap().len(), 30);
        assert_eq!(actions("user").unwrap()[0], "login");
        assert!(actions("nope").is_none());
    }

    #[test]
    fn test_no_duplicate_actions() {
        for (namespace, actions) in EVENTS {
            let mut seen = std::collections::HashSet::new();
            for action in *actions {
                assert!(seen.insert(action), "duplicate {}.{}", namespace, action);
            }
        }
    }

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(resolve_namespace("fleet"), Some("application"));
        assert_eq!(resolve_namespace("application"), Some("application"));
        assert_eq!(actions("fleetTag"), actions("applicationTag"));
        assert_eq!(
            lookup("fleet", "pinToRelease").as_deref(),
            Some("Application Pin To Release")
        );
        for (alias, _) in ALIASES {
            assert!(EVENTS.iter().all(|(n, _)| n != alias));
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(
            lookup("deviceEnvironmentVariable", "create").as_deref(),
            Some("Device Environment Variable Create")
        );
        assert!(lookup("device", "explode").is_none());
        assert!(lookup("spaceship", "open").is_none());
    }

    #[test]
    fn test_labels_cover_every_pair() {
        let total: usize = EVENTS.iter().map(|(_, a)| a.len()).sum();
        let labels: Vec<_> = labels().collect();
        assert_eq!(labels.len(), total);
        assert!(labels.contains(&(
            "gettingStartedGuide",
            "modalGuideOpen",
            "Getting Started Guide Modal Guide Open".to_string()
        )));
    }
}
