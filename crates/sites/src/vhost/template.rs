//! nginx vhost rendering.

use std::path::Path;

const HEADER: &str = "# Managed by staticland. Changes are overwritten on the next deploy.";

/// TLS site: plain HTTP only serves ACME challenges and redirects to HTTPS.
pub fn render_ssl(domain: &str, sites_dir: &Path, certs_dir: &Path, vhosts_dir: &Path) -> String {
    let webroot = sites_dir.join(domain);
    let live = certs_dir.join("live").join(domain);
    let snippets = vhosts_dir.join(domain);

    format!(
        r#"{header}
server {{
    listen 80;
    listen [::]:80;
    server_name {domain};

    location /.well-known/acme-challenge/ {{
        root {webroot};
    }}

    location / {{
        return 301 https://$host$request_uri;
    }}
}}

server {{
    listen 443 ssl;
    listen [::]:443 ssl;
    http2 on;
    server_name {domain};

    ssl_certificate {fullchain};
    ssl_certificate_key {privkey};

    root {webroot};
    index index.html;

    include {snippets}/*.conf;

    location / {{
        try_files $uri $uri/ $uri.html =404;
    }}
}}
"#,
        header = HEADER,
        domain = domain,
        webroot = webroot.display(),
        fullchain = live.join("fullchain.pem").display(),
        privkey = live.join("privkey.pem").display(),
        snippets = snippets.display(),
    )
}

/// Redirect every request for `slug` to the same path on `target`.
pub fn render_redirect(slug: &str, target: &str) -> String {
    format!(
        r#"{header}
server {{
    listen 80;
    listen [::]:80;
    server_name {slug};

    return 301 https://{target}$request_uri;
}}
"#,
        header = HEADER,
        slug = slug,
        target = target,
    )
}
