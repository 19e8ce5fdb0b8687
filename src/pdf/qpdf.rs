//! qpdf FFI wrapper for document mutation
//!
//! Page assembly (merge, extract, burst), password protection, and
//! protection inspection using the qpdf crate (vendored FFI).

use crate::error::{Error, Result};
use qpdf::{EncryptionParams, EncryptionParamsR6, PrintPermission, QPdf};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Wrapper for qpdf operations via FFI
pub struct QpdfWrapper;

/// Printing rights granted by a protected document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrintAccess {
    /// High-resolution printing
    #[default]
    Full,
    /// Low-resolution printing only
    Low,
    /// No printing
    None,
}

impl From<PrintAccess> for PrintPermission {
    fn from(access: PrintAccess) -> Self {
        match access {
            PrintAccess::Full => PrintPermission::Full,
            PrintAccess::Low => PrintPermission::Low,
            PrintAccess::None => PrintPermission::None,
        }
    }
}

/// Passwords and permissions for [`QpdfWrapper::encrypt`]
#[derive(Debug, Clone, Default)]
pub struct ProtectOptions {
    /// Password required to open the document
    pub user_password: String,
    /// Password required to change permissions (defaults to the user password)
    pub owner_password: Option<String>,
    pub print: PrintAccess,
    pub allow_copy: bool,
    pub allow_modify: bool,
    /// Password of the input, if it is already protected
    pub source_password: Option<String>,
}

/// Result of a password-protection check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ProtectionStatus {
    /// Whether the document carries an encryption dictionary
    pub is_encrypted: bool,
    /// Whether a password is needed to open it
    pub requires_password: bool,
    /// Whether the supplied password opens the document (only set when a password was given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_valid: Option<bool>,
}

/// Helper: open a QPdf from memory, optionally with password
fn open_qpdf(data: &[u8], password: Option<&str>) -> Result<QPdf> {
    match password {
        Some(pwd) => {
            QPdf::read_from_memory_encrypted(data, pwd).map_err(|e| map_qpdf_error(e, true))
        }
        None => QPdf::read_from_memory(data).map_err(|e| map_qpdf_error(e, false)),
    }
}

/// Map qpdf crate errors to our error types
fn map_qpdf_error(e: qpdf::QPdfError, password_given: bool) -> Error {
    match e.error_code() {
        qpdf::QPdfErrorCode::InvalidPassword if password_given => Error::IncorrectPassword,
        qpdf::QPdfErrorCode::InvalidPassword => Error::PasswordRequired,
        _ => Error::QpdfError {
            reason: e.to_string(),
        },
    }
}

fn write_error(e: qpdf::QPdfError) -> Error {
    Error::QpdfError {
        reason: format!("Failed to write PDF: {}", e),
    }
}

/// Copy the given 1-indexed pages of `source` into a fresh unencrypted document
fn assemble(source: &QPdf, pages: &[u32], total: u32) -> Result<Vec<u8>> {
    let dest = QPdf::empty();

    for &page_num in pages {
        let page = page_num
            .checked_sub(1)
            .and_then(|idx| source.get_page(idx))
            .ok_or(Error::PageOutOfBounds {
                page: page_num,
                total,
            })?;
        let copied = dest.copy_from_foreign(&page);
        dest.add_page(&copied, false).map_err(write_error)?;
    }

    let mut writer = dest.writer();
    writer.preserve_encryption(false);
    writer.write_to_memory().map_err(write_error)
}

fn require_pages(pages: &[u32]) -> Result<()> {
    if pages.is_empty() {
        return Err(Error::InvalidPageRange {
            range: "no pages selected".to_string(),
        });
    }
    Ok(())
}

impl QpdfWrapper {
    /// Merge documents: every page of input 1, then input 2, and so on.
    ///
    /// Inputs are read in order; the first unreadable one aborts the merge
    /// with [`Error::SourceFailed`] carrying its 1-indexed position.
    pub fn merge(inputs: &[&[u8]]) -> Result<Vec<u8>> {
        if inputs.len() < 2 {
            return Err(Error::TooFewSources {
                required: 2,
                given: inputs.len(),
            });
        }

        let dest = QPdf::empty();

        for (i, input_data) in inputs.iter().enumerate() {
            let failed = |source: Error| Error::SourceFailed {
                index: i + 1,
                source: Box::new(source),
            };

            let source = open_qpdf(input_data, None).map_err(failed)?;
            let pages = source
                .get_pages()
                .map_err(|e| failed(map_qpdf_error(e, false)))?;

            for page in &pages {
                let copied = dest.copy_from_foreign(page);
                dest.add_page(&copied, false).map_err(write_error)?;
            }
        }

        dest.writer().write_to_memory().map_err(write_error)
    }

    /// One document holding the given pages (1-indexed) in the order given
    pub fn extract_pages(input_data: &[u8], pages: &[u32], password: Option<&str>) -> Result<Vec<u8>> {
        require_pages(pages)?;
        let source = open_qpdf(input_data, password)?;
        let total = source
            .get_num_pages()
            .map_err(|e| map_qpdf_error(e, password.is_some()))?;
        assemble(&source, pages, total)
    }

    /// One single-page document per selected page, paired with its page number
    pub fn burst_pages(
        input_data: &[u8],
        pages: &[u32],
        password: Option<&str>,
    ) -> Result<Vec<(u32, Vec<u8>)>> {
        require_pages(pages)?;
        let source = open_qpdf(input_data, password)?;
        let total = source
            .get_num_pages()
            .map_err(|e| map_qpdf_error(e, password.is_some()))?;

        pages
            .iter()
            .map(|&page| assemble(&source, &[page], total).map(|bytes| (page, bytes)))
            .collect()
    }

    /// Protect a document with AES-256 (R6) encryption
    pub fn encrypt(input_data: &[u8], options: &ProtectOptions) -> Result<Vec<u8>> {
        if options.user_password.is_empty() {
            return Err(Error::EmptyInput {
                field: "user_password".to_string(),
            });
        }

        let qpdf = open_qpdf(input_data, options.source_password.as_deref())?;
        let owner_pwd = options
            .owner_password
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&options.user_password);

        let encryption = EncryptionParams::R6(EncryptionParamsR6 {
            user_password: options.user_password.clone(),
            owner_password: owner_pwd.to_string(),
            allow_accessibility: true,
            allow_extract: options.allow_copy,
            allow_assemble: options.allow_modify,
            allow_annotate_and_form: options.allow_modify,
            allow_form_filling: options.allow_modify,
            allow_modify_other: options.allow_modify,
            allow_print: options.print.into(),
            encrypt_metadata: true,
        });

        let mut writer = qpdf.writer();
        writer
            .preserve_encryption(false)
            .encryption_params(encryption);
        writer.write_to_memory().map_err(write_error)
    }

    /// Report whether a document is encrypted, whether opening it needs a
    /// password, and whether `password` (if given) opens it.
    pub fn inspect_protection(input_data: &[u8], password: Option<&str>) -> Result<ProtectionStatus> {
        let (is_encrypted, requires_password) = match QPdf::read_from_memory(input_data) {
            Ok(qpdf) => (qpdf.is_encrypted(), false),
            Err(e) if matches!(e.error_code(), qpdf::QPdfErrorCode::InvalidPassword) => {
                (true, true)
            }
            Err(e) => return Err(map_qpdf_error(e, false)),
        };

        let password_valid = match password {
            Some(pwd) if is_encrypted => {
                Some(QPdf::read_from_memory_encrypted(input_data, pwd).is_ok())
            }
            _ => None,
        };

        Ok(ProtectionStatus {
            is_encrypted,
            requires_password,
            password_valid,
        })
    }

    /// Get the page count of a PDF
    pub fn page_count(input_data: &[u8], password: Option<&str>) -> Result<u32> {
        let qpdf = open_qpdf(input_data, password)?;
        qpdf.get_num_pages()
            .map_err(|e| map_qpdf_error(e, password.is_some()))
    }
}
