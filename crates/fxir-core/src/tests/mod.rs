/*! Test coverage for the core IR.
 *
 * Every lowering pass trusts these types to report widths and bounds exactly. These tests pin down
 * interval encodings, expression traversal, inference width rules and the textual form.
 */
