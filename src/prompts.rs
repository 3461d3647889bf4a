//! The extraction instruction sent with every BOL page.
//!
//! Kept in one place so the 13-field contract between the vision model and
//! [`crate::pipeline::normalize`] can be reviewed (and tested) together.
//! Callers may override it via [`crate::config::BatchConfig::instruction`].

/// JSON keys the instruction asks the model to return, in schema order.
pub const EXTRACTION_FIELDS: [&str; 13] = [
    "pro",
    "zone",
    "weight",
    "volume",
    "liftgate",
    "inside",
    "residential",
    "overLength",
    "palletCount",
    "hasDebrisSection",
    "isLakeshore",
    "timeSpecific",
    "detention",
];

/// Default instruction for extracting shipment fields from one BOL page.
pub const DEFAULT_EXTRACTION_INSTRUCTION: &str = r#"You are analyzing a Bill of Lading (BOL). Extract the following information with extreme precision.

1. PRO# (job number)
   - Look for "PRO#", "PRO NUMBER", or a similar tracking number. This is the unique job identifier.

2. ZONE - single uppercase letter A through L
   - Read it from the "Deliver To" / consignee section on the RIGHT side.
   - Do NOT use the pickup/shipper zone.

3. ACTUAL WEIGHT - total pounds (sum all line items)

4. VOLUME - total cubic feet (ft3); 0 if not shown

5. LIFTGATE - "Yes" or ""
   - Any printed, handwritten, circled or checked indication of "liftgate", "lift gate", "tailgate".

6. INSIDE DELIVERY - "Yes" or ""
   - Check printed text AND handwritten notes, especially "Additional Information".
   - Phrases: "inside delivery", "inside", "threshold", "room of choice", "I care".

7. RESIDENTIAL - "Yes" or ""
   - Only with an explicit indicator: "residential", "res", "rsdl", or a marked residential checkbox.
   - Do NOT infer from the address alone.

8. OVER LENGTH - longest dimension bucket in INCHES
   - Exactly one of "97-144", "145-192", "193-240", "241 or more", or "" when every dimension is under 97 inches.

9. DEBRIS REMOVAL
   - palletCount: number of pallets/skids
   - hasDebrisSection: true if the BOL has a debris removal section or checkbox
   - isLakeshore: true if the shipper, consignee or client name contains "Lakeshore"

10. TIME SPECIFIC - exactly one of "AM Special", "2 Hours", "15 Minutes", or ""
   - Indicators: handwritten or circled "T.S"/"TS", "APPOINTMENT DELIVERY", "AM DELIVERY", "AM SPECIAL", "2 HOUR WINDOW", "15 MINUTE WINDOW".
   - "T.S" or "APPOINTMENT DELIVERY" without a stated window means "2 Hours".

11. DETENTION - total minutes of detention/waiting time as a number, 0 if none

Return ONLY valid JSON in exactly this format (no markdown, no backticks):
{
  "pro": "string",
  "zone": "single letter A-L",
  "weight": number,
  "volume": number,
  "liftgate": "Yes" or "",
  "inside": "Yes" or "",
  "residential": "Yes" or "",
  "overLength": "97-144" or "145-192" or "193-240" or "241 or more" or "",
  "palletCount": number,
  "hasDebrisSection": boolean,
  "isLakeshore": boolean,
  "timeSpecific": "AM Special" or "2 Hours" or "15 Minutes" or "",
  "detention": number
}

EXAMPLES:
- Delivery section shows "Zone: H" -> "zone": "H" (not the pickup zone)
- "Lakeshore" as shipper with 5 pallets -> "palletCount": 5, "isLakeshore": true
- Debris removal checkbox marked -> "hasDebrisSection": true
- Handwritten "inside" or "I care" -> "inside": "Yes"
- "(DEL) APPOINTMENT DELIVERY Required" -> "timeSpecific": "2 Hours"
- Longest dimension 120 inches -> "overLength": "97-144"
- Longest dimension 250 inches -> "overLength": "241 or more"
- Volume column shows 44.44 -> "volume": 44.44
- 45 minutes detention -> "detention": 45
- No liftgate mentioned -> "liftgate": """#;
