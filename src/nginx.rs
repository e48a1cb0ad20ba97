use std::fmt::Write as _;

use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::provision::Privilege;
use crate::ssh::Remote;

pub const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
pub const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// Configuration for the Nginx reverse proxy site.
///
/// # Example
///
/// ```
/// use dockhand::Nginx;
///
/// let nginx = Nginx::new(8080).server_name("shop.example.com");
///
/// let site = nginx.render();
/// assert!(site.contains("listen 80;"));
/// assert!(site.contains("proxy_pass http://127.0.0.1:8080;"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nginx {
    pub listen: u16,
    pub server_name: String,
    pub upstream_port: u16,
    pub extra_directives: Vec<String>,
}

impl Nginx {
    #[must_use]
    pub fn new(upstream_port: u16) -> Self {
        Self {
            listen: 80,
            server_name: "_".to_string(),
            upstream_port,
            extra_directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn server_name(mut self, name: &str) -> Self {
        self.server_name = name.to_string();
        self
    }

    #[must_use]
    pub const fn listen(mut self, port: u16) -> Self {
        self.listen = port;
        self
    }

    #[must_use]
    pub fn directive(mut self, raw: &str) -> Self {
        self.extra_directives.push(raw.to_string());
        self
    }

    /// Render the complete `server { ... }` block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("server {\n");
        let _ = writeln!(out, "    listen {};", self.listen);
        let _ = writeln!(out, "    server_name {};", self.server_name);
        for d in &self.extra_directives {
            let d = d.trim_end_matches(';');
            let _ = writeln!(out, "    {d};");
        }
        out.push('\n');
        out.push_str("    location / {\n");
        let _ = writeln!(
            out,
            "        proxy_pass http://127.0.0.1:{};",
            self.upstream_port
        );
        out.push_str("        proxy_set_header Host $host;\n");
        out.push_str("        proxy_set_header X-Real-IP $remote_addr;\n");
        out.push_str("        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n");
        out.push_str("        proxy_set_header X-Forwarded-Proto $scheme;\n");
        out.push_str("    }\n");
        out.push_str("}\n");
        out
    }
}

/// Install `nginx` as site `site_name`, drop the default site, validate
/// and reload. Every failure is terminal.
pub fn configure(
    remote: &dyn Remote,
    nginx: &Nginx,
    site_name: &str,
    privilege: Privilege,
) -> DeployResult<()> {
    let sudo = privilege.prefix();
    let available = format!("{SITES_AVAILABLE}/{site_name}");
    let enabled = format!("{SITES_ENABLED}/{site_name}");

    info!(
        "Configuring Nginx: :{} -> 127.0.0.1:{}",
        nginx.listen, nginx.upstream_port
    );

    let write = remote
        .exec_with_input(
            &format!("{sudo}tee {available} > /dev/null"),
            nginx.render().as_bytes(),
        )
        .map_err(|e| DeployError::ProxyConfig(format!("write {available}: {e}")))?;
    write.into_stdout(&format!("write {available}"), DeployError::ProxyConfig)?;

    run_step(
        remote,
        "remove default site",
        &format!("{sudo}rm -f {SITES_ENABLED}/default"),
    )?;
    run_step(
        remote,
        "enable site",
        &format!("{sudo}ln -sf {available} {enabled}"),
    )?;
    run_step(remote, "nginx -t", &format!("{sudo}nginx -t"))?;
    run_step(
        remote,
        "reload nginx",
        &format!("{sudo}systemctl reload nginx"),
    )?;

    info!("Nginx site {site_name} enabled");
    Ok(())
}

fn run_step(remote: &dyn Remote, label: &str, command: &str) -> DeployResult<()> {
    info!("[proxy] {label}");
    remote
        .exec(command)
        .map_err(|e| DeployError::ProxyConfig(format!("{label}: {e}")))?
        .into_stdout(label, DeployError::ProxyConfig)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let nginx = Nginx::new(3000);

        assert_eq!(nginx.listen, 80);
        assert_eq!(nginx.server_name, "_");
        assert_eq!(nginx.upstream_port, 3000);
        assert!(nginx.extra_directives.is_empty());
    }

    #[test]
    fn directive_semicolon_not_doubled() {
        let site = Nginx::new(3000)
            .directive("client_max_body_size 20m;")
            .render();

        assert!(site.contains("    client_max_body_size 20m;\n"));
        assert!(!site.contains(";;"));
    }

    #[test]
    fn braces_balanced() {
        let site = Nginx::new(1).directive("access_log off").render();

        assert_eq!(site.matches('{').count(), site.matches('}').count());
    }
}
