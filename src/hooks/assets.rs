//! Media asset validator: flags images and video served from outside the
//! configured CDN hosts. Warns only.

use regex::Regex;
use std::sync::OnceLock;

use super::HookContext;
use crate::hook::{HookInput, HookOutcome};

const CHECKED: &[&str] = &[".tsx", ".ts", ".jsx", ".js", ".md", ".mdx"];
const ALWAYS_ALLOWED: &[&str] = &["localhost", "127.0.0.1", "/api/cloudinary", "data:image", ".svg"];
const MAX_SHOWN: usize = 5;

struct MediaPatterns {
    urls: Vec<Regex>,
    next_image: Regex,
}

fn media_patterns() -> &'static MediaPatterns {
    static RE: OnceLock<MediaPatterns> = OnceLock::new();
    RE.get_or_init(|| {
        let ext = "jpg|jpeg|png|gif|webp|mp4|mov|avi|svg";
        MediaPatterns {
            urls: vec![
                Regex::new(&format!(r#"(?i)(https?://[^\s'"]+\.(?:{}))"#, ext)).expect("valid regex"),
                Regex::new(&format!(r#"(?i)src\s*=\s*['"](/[^'"]*\.(?:{}))['"]"#, ext))
                    .expect("valid regex"),
                Regex::new(&format!(r#"(?i)url\s*\(\s*['"](/[^'"]*\.(?:{}))['"]\s*\)"#, ext))
                    .expect("valid regex"),
            ],
            next_image: Regex::new(r#"<Image[^>]*src\s*=\s*['"](https?://[^'"]+)['"]"#)
                .expect("valid regex"),
        }
    })
}

/// Media references that do not go through an accepted host.
pub fn violations(content: &str, media_hosts: &[String]) -> Vec<String> {
    let patterns = media_patterns();
    let allowed = |url: &str| {
        let lower = url.to_lowercase();
        media_hosts.iter().any(|host| lower.contains(&host.to_lowercase()))
            || ALWAYS_ALLOWED.iter().any(|token| lower.contains(token))
            || url.starts_with('#')
    };

    let mut found = Vec::new();
    for re in &patterns.urls {
        for cap in re.captures_iter(content) {
            let url = &cap[1];
            if !allowed(url) {
                found.push(url.to_string());
            }
        }
    }
    for cap in patterns.next_image.captures_iter(content) {
        let url = &cap[1];
        if !media_hosts.iter().any(|host| url.contains(host.as_str())) && !url.contains("localhost") {
            found.push(format!("Next.js Image: {}", url));
        }
    }
    found
}

pub fn run(input: &HookInput, ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let Some(file_path) = input.file_path() else {
        return Ok(HookOutcome::silent());
    };
    let content = input.edited_text();
    if content.is_empty() {
        return Ok(HookOutcome::silent());
    }
    let path = ctx.display_path(file_path);
    let hosts = &ctx.config.media_hosts;
    let mut lines = Vec::new();

    let lower_path = path.to_lowercase();
    if CHECKED.iter().any(|ext| lower_path.contains(ext)) {
        let found = violations(content, hosts);
        if !found.is_empty() {
            lines.push(format!("📸 Non-CDN assets detected in {}:", path));
            for url in found.iter().take(MAX_SHOWN) {
                lines.push(format!("  • {}", url));
            }
            if found.len() > MAX_SHOWN {
                lines.push(format!("  • ... and {} more", found.len() - MAX_SHOWN));
            }
            lines.push("\n💡 Recommendations:".to_string());
            lines.push("  • Upload images to the CDN and reference them by public id".to_string());
            lines.push("  • Use next-cloudinary components: <CldImage>, <CldVideo>".to_string());
            lines.push("  • For development, use localhost URLs".to_string());
            lines.push("  • SVG icons can remain local for better performance".to_string());
            lines.push("\n🔗 Learn more: https://next.cloudinary.dev/".to_string());
        } else if content.contains("<Image")
            && content.contains("next/image")
            && !content.to_lowercase().contains("cloudinary")
        {
            lines.push(format!(
                "💡 Consider using next-cloudinary for better optimization in {}",
                path
            ));
        }
    }

    if path.contains("next.config") {
        if content.to_lowercase().contains("cloudinary")
            && !content.contains("NEXT_PUBLIC_CLOUDINARY_CLOUD_NAME")
        {
            lines.push(format!(
                "⚠️ Missing NEXT_PUBLIC_CLOUDINARY_CLOUD_NAME in {}",
                path
            ));
        }
        if let Some(host) = hosts.last() {
            if !content.contains(host.as_str()) {
                lines.push(format!("💡 Add '{}' to image domains in {}", host, path));
            }
        }
    }

    Ok(HookOutcome::allow(lines.join("\n")))
}
