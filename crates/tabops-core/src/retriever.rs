//! Content package and view rendition downloads

use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, info, instrument};

use crate::{
    context::SiteContext,
    error::{OpsError, Result},
    models::{ContentKind, Rendition},
    resolver::Resolver,
};

/// Local file name for a downloaded asset: spaces become underscores and path
/// separators are replaced so the file always lands inside the download dir.
pub fn local_filename(name: &str, extension: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    format!("{stem}.{extension}")
}

/// Downloads assets into a local directory
#[derive(Clone)]
pub struct AssetRetriever {
    ctx: SiteContext,
    download_dir: PathBuf,
}

impl AssetRetriever {
    pub fn new(ctx: SiteContext, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            ctx,
            download_dir: download_dir.into(),
        }
    }

    /// Download a packaged workbook (`twbx`) or datasource (`tdsx`).
    ///
    /// The package is first written under the server-assigned file name, then
    /// renamed to `<name>.<ext>`. Returns the final path.
    #[instrument(skip(self))]
    pub async fn download_package(
        &self,
        content_type: &str,
        content_name: &str,
        project_name: Option<&str>,
        format_type: Option<&str>,
    ) -> Result<PathBuf> {
        let kind = ContentKind::parse(content_type)?;
        let extension = kind.package_extension();
        if let Some(format) = format_type.map(str::trim).filter(|f| !f.is_empty()) {
            if !format.eq_ignore_ascii_case(extension) {
                return Err(OpsError::InvalidFormat(format!(
                    "'{format}' is not a valid package format for a {kind}; use '{extension}'"
                )));
            }
        }

        let (item, package) = self
            .ctx
            .run(|store| async move {
                let resolver = Resolver::new(store.as_ref());
                let project = resolver.optional_project(project_name).await?;
                let item = resolver.content(kind, content_name, project.as_ref()).await?;
                // Workbooks ship without their extract; datasource packages keep their data
                let include_extract = kind == ContentKind::Datasource;
                let package = store.download_content(kind, &item.id, include_extract).await?;
                Ok((item, package))
            })
            .await?;

        fs::create_dir_all(&self.download_dir).await?;
        let server_name = package
            .filename
            .as_deref()
            .map(|f| local_filename(f.trim_end_matches(&format!(".{extension}")), extension))
            .unwrap_or_else(|| local_filename(&item.id, extension));
        let staged = self.download_dir.join(server_name);
        fs::write(&staged, &package.bytes).await?;

        let target = self.download_dir.join(local_filename(&item.name, extension));
        if staged != target {
            fs::rename(&staged, &target).await?;
        }

        info!(%kind, content = %item.name, path = %target.display(), bytes = package.bytes.len(), "Downloaded package");
        Ok(target)
    }

    /// Render a view as an image, PDF or CSV and write it to disk.
    ///
    /// The rendition may arrive in several chunks; they are concatenated in
    /// order. The file is named after the view as the server spells it.
    #[instrument(skip(self))]
    pub async fn download_view(&self, view_name: &str, download_type: &str) -> Result<PathBuf> {
        let rendition: Rendition = download_type.parse()?;

        let (view, chunks) = self
            .ctx
            .run(|store| async move {
                let view = Resolver::new(store.as_ref()).view(view_name).await?;
                let chunks = store.render_view(&view.id, rendition).await?;
                Ok((view, chunks))
            })
            .await?;

        debug!(view = %view.name, chunks = chunks.len(), "Received rendition");
        let bytes = chunks.concat();

        fs::create_dir_all(&self.download_dir).await?;
        let path = self
            .download_dir
            .join(local_filename(&view.name, rendition.extension()));
        fs::write(&path, &bytes).await?;

        info!(view = %view.name, format = rendition.as_str(), path = %path.display(), "Downloaded view");
        Ok(path)
    }
}
