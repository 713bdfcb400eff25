//! Do Not Disturb backends for different platforms
//!
//! Silencing notifications is a convenience, not part of the blocking
//! guarantee: callers log failures and carry on.
//!
//! Sessions run under sudo, so the Linux backends switch back to the
//! invoking user and their session bus before calling the desktop tools.

use anyhow::Result;
use shield_core::process::{self, InvokingUser};

/// Toggles the desktop "do not disturb" mode
pub trait NotificationSilencer: Send + Sync {
    /// Return the backend name
    fn name(&self) -> &str;

    /// Turn notification suppression on or off
    fn set_do_not_disturb(&self, enabled: bool) -> Result<()>;
}

/// Available silencing backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DndBackend {
    /// macOS Control Center, driven through System Events UI scripting
    ControlCenter,
    /// GNOME notification banners via gsettings
    Gnome,
    /// dunst notification daemon
    Dunst,
    /// Nothing to toggle
    Disabled,
}

impl DndBackend {
    /// Detect the best available backend for the current platform
    pub fn detect() -> Self {
        #[cfg(target_os = "macos")]
        {
            return Self::ControlCenter;
        }

        #[cfg(target_os = "linux")]
        {
            if process::command_exists("gsettings")
                && std::env::var("XDG_CURRENT_DESKTOP")
                    .map(|d| d.to_uppercase().contains("GNOME"))
                    .unwrap_or(false)
            {
                return Self::Gnome;
            }
            if process::command_exists("dunstctl") {
                return Self::Dunst;
            }
            return Self::Disabled;
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            Self::Disabled
        }
    }

    fn set_control_center(&self, enabled: bool) -> Result<()> {
        process::run("osascript", &["-e", &control_center_script(enabled)])
    }

    fn set_gnome(&self, enabled: bool) -> Result<()> {
        // show-banners is the inverse of do-not-disturb
        let banners = if enabled { "false" } else { "true" };
        run_as_desktop_user(
            "gsettings",
            &["set", "org.gnome.desktop.notifications", "show-banners", banners],
        )
    }

    fn set_dunst(&self, enabled: bool) -> Result<()> {
        let paused = if enabled { "true" } else { "false" };
        run_as_desktop_user("dunstctl", &["set-paused", paused])
    }
}

fn run_as_desktop_user(program: &str, args: &[&str]) -> Result<()> {
    let user = InvokingUser::from_sudo_env();
    let (program, args) = desktop_command(user.as_ref(), program, args);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    process::run(&program, &args)
}

/// Wrap `program` so it runs as `user` against their session bus.
/// Without a sudo user the command runs unchanged.
fn desktop_command(user: Option<&InvokingUser>, program: &str, args: &[&str]) -> (String, Vec<String>) {
    let Some(user) = user else {
        return (
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        );
    };

    let mut wrapped = vec![
        "-u".to_string(),
        user.name.clone(),
        "env".to_string(),
        format!("DBUS_SESSION_BUS_ADDRESS={}", user.session_bus()),
        format!("XDG_RUNTIME_DIR=/run/user/{}", user.uid),
        program.to_string(),
    ];
    wrapped.extend(args.iter().map(|a| a.to_string()));
    ("sudo".to_string(), wrapped)
}

impl NotificationSilencer for DndBackend {
    fn name(&self) -> &str {
        match self {
            Self::ControlCenter => "control-center",
            Self::Gnome => "gnome",
            Self::Dunst => "dunst",
            Self::Disabled => "disabled",
        }
    }

    fn set_do_not_disturb(&self, enabled: bool) -> Result<()> {
        match self {
            Self::ControlCenter => self.set_control_center(enabled),
            Self::Gnome => self.set_gnome(enabled),
            Self::Dunst => self.set_dunst(enabled),
            Self::Disabled => Ok(()),
        }
    }
}

/// AppleScript that opens Control Center and clicks the Do Not Disturb
/// checkbox only when its state differs from the one wanted.
fn control_center_script(enabled: bool) -> String {
    let wanted = if enabled { "1" } else { "0" };
    format!(
        r#"tell application "System Events" to tell application process "Control Center"
    click menu bar item "Control Center" of menu bar 1
    delay 0.5
    set dnd to checkbox "Do Not Disturb" of group 1 of window "Control Center"
    if (value of dnd as integer) is not {wanted} then click dnd
    key code 53
end tell"#,
        wanted = wanted
    )
}
