/*!
 * Tests for remote provider clients against a local mock server
 */


// FPT.AI client tests
pub mod fpt_tests;



// Local command engine tests
pub mod local_tests;
