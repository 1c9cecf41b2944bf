//! Image intake for brand logos and employee photos.
//!
//! Uploads arrive either as a multipart file or as an inline
//! `data:image/<type>;base64,<payload>` URL. Either way they end up as an
//! [`ImageUpload`], are stored under a tenant-scoped path, and come back
//! as a public URL.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mipropina_core::error::{MiPropinaError, MiPropinaResult};
use mipropina_core::gateway::BlobStore;
use mipropina_core::slug::fold_diacritics;
use tracing::info;
use uuid::Uuid;

const MAX_BASE_LENGTH: usize = 80;
const FALLBACK_BASE: &str = "logo";

/// Accepted content types and the extension each is stored under. The
/// stored extension decides how `/assets` serves the file, so it never
/// comes from the client's file name.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

const UNSUPPORTED_IMAGE: &str = "Formato de imagen no soportado. Usa PNG, JPG, WEBP o GIF.";

/// A decoded image ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Client-supplied file name, when there was one.
    pub file_name: Option<String>,
}

impl ImageUpload {
    /// Accept a multipart file part. The declared content type must be one
    /// of the supported raster formats and the body must be non-empty.
    pub fn from_file(
        bytes: Vec<u8>,
        content_type: &str,
        file_name: Option<String>,
    ) -> MiPropinaResult<Self> {
        let content_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(MiPropinaError::MalformedPayload(
                "Solo se permiten archivos de imagen".into(),
            ));
        }
        if extension_for(&content_type).is_none() {
            return Err(MiPropinaError::MalformedPayload(UNSUPPORTED_IMAGE.into()));
        }
        if bytes.is_empty() {
            return Err(MiPropinaError::MalformedPayload("La imagen esta vacia".into()));
        }
        Ok(Self {
            bytes,
            content_type,
            file_name,
        })
    }

    /// Parse a `data:image/<type>;base64,<payload>` URL.
    pub fn from_data_url(data_url: &str) -> MiPropinaResult<Self> {
        let malformed = || MiPropinaError::MalformedPayload("Formato de imagen no valido".into());

        let rest = data_url.trim().strip_prefix("data:").ok_or_else(malformed)?;
        let (content_type, payload) = rest.split_once(";base64,").ok_or_else(malformed)?;

        let subtype = content_type.strip_prefix("image/").ok_or_else(malformed)?;
        let valid_subtype = !subtype.is_empty()
            && subtype
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'));
        if !valid_subtype {
            return Err(malformed());
        }

        let bytes = STANDARD.decode(payload.trim()).map_err(|_| malformed())?;
        Self::from_file(bytes, content_type, None)
    }

    /// Stored extension for the validated content type.
    pub fn extension(&self) -> &'static str {
        extension_for(&self.content_type).unwrap_or("jpg")
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == content_type)
        .map(|(_, ext)| *ext)
}

/// Whether an employee `image` field carries inline image data rather than
/// an already-stored URL.
pub fn is_inline_image(value: &str) -> bool {
    value.trim_start().starts_with("data:image/")
}

/// Reduce a client file name to a `[a-z0-9-_]` stem. The client's
/// extension is dropped.
///
/// `"Logo Café!!.PNG"` becomes `"logo-cafe"`. Names that reduce to
/// nothing fall back to `logo`.
pub fn safe_file_stem(file_name: &str) -> String {
    let trimmed = file_name.trim();
    let base = match trimmed.rsplit_once('.') {
        Some((base, _)) => base,
        None => trimmed,
    };

    let mut stem = String::with_capacity(base.len());
    let mut pending_hyphen = false;
    for c in fold_diacritics(base).chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
            if pending_hyphen {
                stem.push('-');
                pending_hyphen = false;
            }
            stem.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    let stem: String = stem.trim_matches('-').chars().take(MAX_BASE_LENGTH).collect();
    if stem.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        stem
    }
}

/// Stores tenant images and hands back their public URLs.
#[derive(Debug, Clone)]
pub struct AssetUploadMediator<B: BlobStore> {
    store: B,
    bucket: String,
    prefix: String,
}

impl<B: BlobStore> AssetUploadMediator<B> {
    pub fn new(store: B, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    /// `{prefix}/{slug}/{safe-stem}.{ext}`. The same file name and type
    /// overwrite the previous logo.
    pub fn logo_path(&self, brand_slug: &str, upload: &ImageUpload) -> String {
        format!(
            "{}/{}/{}.{}",
            self.prefix,
            brand_slug,
            safe_file_stem(upload.file_name.as_deref().unwrap_or_default()),
            upload.extension()
        )
    }

    /// `{prefix}/{slug}/employee/foto/foto-{uuid}.{ext}`, fresh per call.
    pub fn employee_photo_path(&self, brand_slug: &str, upload: &ImageUpload) -> String {
        format!(
            "{}/{}/employee/foto/foto-{}.{}",
            self.prefix,
            brand_slug,
            Uuid::new_v4(),
            upload.extension()
        )
    }

    pub async fn upload_logo(
        &self,
        brand_slug: &str,
        upload: ImageUpload,
    ) -> MiPropinaResult<String> {
        let path = self.logo_path(brand_slug, &upload);
        self.put(path, upload).await
    }

    pub async fn upload_employee_photo(
        &self,
        brand_slug: &str,
        upload: ImageUpload,
    ) -> MiPropinaResult<String> {
        let path = self.employee_photo_path(brand_slug, &upload);
        self.put(path, upload).await
    }

    async fn put(&self, path: String, upload: ImageUpload) -> MiPropinaResult<String> {
        let size = upload.bytes.len();
        self.store
            .put_object(&self.bucket, &path, upload.bytes, &upload.content_type)
            .await?;
        let url = self.store.public_url(&self.bucket, &path);

        info!(bucket = %self.bucket, path = %path, size, "image stored");
        Ok(url)
    }
}
