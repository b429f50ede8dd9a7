//! Instruction templates for the structuring agent.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the 15-column schema below drives the
//!    instruction template, the consolidation tests, and the exported CSV
//!    header; changing a column means editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the template directly
//!    without a live model call, making prompt regressions easy to catch.

/// The fixed column schema the structuring agent is instructed to emit,
/// in output order.
pub const INVOICE_COLUMNS: [&str; 15] = [
    "Invoice Number",
    "Invoice Date",
    "Vendor Name",
    "GSTIN",
    "Buyer Name",
    "GST of Buyer",
    "Invoice Description",
    "HSN/SAC Code",
    "Quantity",
    "Rate by Quantity",
    "Taxable Amount",
    "CGST",
    "SGST",
    "IGST",
    "Total Invoice Value",
];

/// Instruction template for converting raw OCR text into a markdown table.
///
/// The placeholder `{user_input}` must be replaced with the document's
/// extracted text before use; see [`render_invoice_prompt`].
pub const INVOICE_PROMPT_TEMPLATE: &str = r#"As an expert in extracting and organizing invoice data, carefully analyze the provided input {user_input}, which may contain multiple invoices in an unstructured format. Follow these steps to extract and organize the data into a structured markdown table:

1. **Identification**: Identify all relevant invoice details in the text, such as Invoice Number, Invoice Date, Vendor Name, GSTIN, Buyer Name, GST of Buyer, Invoice Description, HSN/SAC Code, Quantity, Rate by Quantity, Taxable Amount, CGST, SGST, IGST, and Total Invoice Value.

2. **Validation**: Ensure that the extracted data is valid and follows the expected format for each field (e.g., dates in YYYY-MM-DD format, numeric fields with proper decimals). If any field is missing or unclear, leave it blank or use a placeholder such as "-".

3. **Deduplication**: Remove duplicate entries to ensure data integrity and clarity. Retain only unique rows.

4. **Formatting**: Organize the extracted information into a well-structured markdown table. The table should have the following columns:
   - Invoice Number
   - Invoice Date
   - Vendor Name
   - GSTIN
   - Buyer Name
   - GST of Buyer
   - Invoice Description
   - HSN/SAC Code
   - Quantity
   - Rate by Quantity
   - Taxable Amount
   - CGST
   - SGST
   - IGST
   - Total Invoice Value

5. **Output**: Return only the completed markdown table without any additional text, explanation, or context.

**Example Table**:
| Invoice Number | Invoice Date | Vendor Name | GSTIN | Buyer Name | GST of Buyer  | Invoice Description  | HSN/SAC Code | Quantity | Rate by Quantity | Taxable Amount | CGST | SGST | IGST | Total Invoice Value |
|----------------|--------------|-------------|-------|------------|---------------|----------------------|--------------|----------|------------------|----------------|------|------|------|---------------------|
| 12345          | 2023-01-01   | Vendor A    | 1234  | Buyer A    | 5678          | Description A        | 12345        | 10       | 100              | 1000           | 90   | 90   | 180  | 1360                |

Ensure that the table you generate is accurate, complete, and free of errors or empty rows. Do not emit subtotal or grand-total lines as separate rows."#;

/// Substitute a document's extracted text into the instruction template.
pub fn render_invoice_prompt(extracted_text: &str) -> String {
    INVOICE_PROMPT_TEMPLATE.replace("{user_input}", extracted_text)
}
