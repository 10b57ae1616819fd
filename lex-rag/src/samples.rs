//! Built-in starter corpus of Indian legal passages.

use serde_json::Value;
use tracing::info;

use crate::document::Metadata;
use crate::error::Result;
use crate::index::EmbeddingIndex;

const EPF_ACT_1952: &str = "THE EMPLOYEES' PROVIDENT FUNDS AND MISCELLANEOUS PROVISIONS ACT, 1952

Section 1. Short title, extent and application.
(1) This Act may be called the Employees' Provident Funds and Miscellaneous Provisions Act, 1952.
(2) It extends to the whole of India.
(3) It applies to every establishment which is a factory engaged in any industry specified in \
Schedule I and in which twenty or more persons are employed.

Section 6. Contributions.
The contribution which shall be paid by the employer to the Fund shall be ten per cent of the \
basic wages, dearness allowance and retaining allowance for each employee. The employees' \
contribution shall be equal to the contribution payable by the employer.

Section 154. Information in cognizable cases.
How to file complaint against SHO: Write application referencing CrPC Section 154(3), attach \
copy of FIR refusal notice, submit to Superintendent of Police office.";

const COMPANIES_ACT_2013: &str = "THE COMPANIES ACT, 2013

Section 128. Books of account.
(1) Every company shall keep at its registered office proper books of account.
(2) The books of account shall give a true and fair view of the state of affairs of the company.

Section 96. Annual general meeting.
(1) Every company shall hold an annual general meeting within six months of the financial year end.

Audit requirements: Companies must appoint auditors and conduct annual audits as per Section 139-148.";

const TDS_GUIDELINES: &str = "TAX DEDUCTED AT SOURCE (TDS)

Section 192. Salary TDS.
Tax shall be deducted at source from salary payments at applicable rates.

TDS Rates:
- Salary: As per income tax slab rates
- Interest: 10% if exceeding Rs. 40,000
- Professional fees: 10% if exceeding Rs. 30,000

Form 26AS shows TDS details for taxpayer verification.";

/// The starter corpus as `(source, text)` pairs.
pub const SAMPLE_DOCUMENTS: [(&str, &str); 3] = [
    ("EPF Act 1952", EPF_ACT_1952),
    ("Companies Act 2013", COMPANIES_ACT_2013),
    ("TDS Guidelines", TDS_GUIDELINES),
];

/// Ingest [`SAMPLE_DOCUMENTS`] unless the index already holds documents.
///
/// Returns the number of documents ingested (zero when already populated).
///
/// # Errors
///
/// Propagates the first ingest error.
pub async fn seed_sample_documents(index: &EmbeddingIndex) -> Result<usize> {
    if index.count().await > 0 {
        info!(collection = index.collection(), "documents already loaded");
        return Ok(0);
    }

    for (source, text) in SAMPLE_DOCUMENTS {
        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), Value::from("legal_act"));
        index.add(text, source, Some(metadata)).await?;
        info!(source, "loaded sample document");
    }
    Ok(SAMPLE_DOCUMENTS.len())
}
