//! Build the site and print a summary

use anyhow::Result;
use std::time::Instant;

use crate::generator::BuildReport;
use crate::Site;

/// Build `site`; per-unit failures are reported, not returned
pub async fn run(site: &Site, clean: bool) -> Result<BuildReport> {
    let start = Instant::now();
    tracing::info!(
        "Building {:?} into {:?}",
        site.content_dir,
        site.output_dir
    );

    let report = site.build(clean).await?;

    for failure in &report.failures {
        eprintln!("skipped ({}): {}", failure.stage(), failure);
    }
    println!("{}", summary(&report));
    tracing::info!("Completed in {:.2}s", start.elapsed().as_secs_f64());

    Ok(report)
}

/// One-line summary of a finished build
pub fn summary(report: &BuildReport) -> String {
    let mut line = format!(
        "Wrote {} posts, {} listing pages ({} files, {} assets)",
        report.units_written,
        report.generated_pages.len(),
        report.files_written,
        report.assets_copied
    );
    if !report.failures.is_empty() {
        line.push_str(&format!(", skipped {}", report.failures.len()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_summary() {
        let report = BuildReport {
            units_written: 3,
            generated_pages: vec![PathBuf::from("index.html"), PathBuf::from("atom.xml")],
            files_written: 5,
            assets_copied: 1,
            ..Default::default()
        };
        assert_eq!(
            summary(&report),
            "Wrote 3 posts, 2 listing pages (5 files, 1 assets)"
        );
    }

    #[tokio::test]
    async fn test_build_reads_config_from_content_root() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(&content).unwrap();
        fs::write(
            content.join("_config.yml"),
            "title: Field Notes\npermalink: posts/:slug/\n",
        )
        .unwrap();
        fs::write(
            content.join("first.md"),
            "---\ntitle: First\ndate: 2022-02-02\n---\n\nHi\n",
        )
        .unwrap();

        let out = dir.path().join("public");
        let site = Site::new(&content, &out, None).unwrap();
        let report = run(&site, false).await.unwrap();

        assert_eq!(report.units_written, 1);
        let page = fs::read_to_string(out.join("posts/first/index.html")).unwrap();
        assert!(page.contains("Field Notes"));
    }

    #[tokio::test]
    async fn test_build_with_layouts_dir() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        let layouts = dir.path().join("layouts");
        fs::create_dir_all(&content).unwrap();
        fs::create_dir_all(&layouts).unwrap();
        fs::write(
            layouts.join("post.html"),
            "<main data-layout=\"custom\">{{ content }}</main>",
        )
        .unwrap();
        fs::write(
            content.join("first.md"),
            "---\ntitle: First\ndate: 2022-02-02\n---\n\nHi\n",
        )
        .unwrap();

        let out = dir.path().join("public");
        let site = Site::new(&content, &out, None)
            .unwrap()
            .with_layouts_dir(Some(layouts));
        run(&site, false).await.unwrap();

        let page = fs::read_to_string(out.join("2022/02/02/first/index.html")).unwrap();
        assert_eq!(page, "<main data-layout=\"custom\"><p>Hi</p>\n</main>");
    }
}
