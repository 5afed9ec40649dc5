//! Shell command builders for link operations

use crate::shell;

/// Build the tunnel creation command
///
/// `gretap` is an ethernet-type device and goes through `ip link add`, every
/// other mode through `ip tunnel add`. Parameters are appended in order.
pub fn build_tunnel_create_cmd(name: &str, mode: &str, params: &[(String, String)]) -> String {
    let mut cmd = if mode == "gretap" {
        format!(
            "{} link add {} type {}",
            shell::IP_CMD,
            shell::shellquote(name),
            shell::shellquote(mode)
        )
    } else {
        format!(
            "{} tunnel add {} mode {}",
            shell::IP_CMD,
            shell::shellquote(name),
            shell::shellquote(mode)
        )
    };

    for (param, value) in params {
        cmd.push(' ');
        cmd.push_str(param);
        if !value.is_empty() {
            cmd.push(' ');
            cmd.push_str(&shell::shellquote(value));
        }
    }
    cmd
}

/// Build link deletion command
pub fn build_link_del_cmd(name: &str) -> String {
    format!("{} link del {}", shell::IP_CMD, shell::shellquote(name))
}

/// Build detailed JSON link dump command
pub fn build_link_show_cmd(name: &str) -> String {
    format!(
        "{} -d -j link show dev {}",
        shell::IP_CMD,
        shell::shellquote(name)
    )
}
