//! Common source code fixtures for tests.

pub const STORAGE_TYPE: &str = "Microsoft.Storage/storageAccounts@2022-09-01";

pub const PARAM_OUTPUT: &str = "param name string = 'x'\noutput result string = name\n";

pub const STORAGE_ACCOUNT: &str = r#"param location string = 'westus'

resource account 'Microsoft.Storage/storageAccounts@2022-09-01' = {
  name: 'store${uniqueString(resourceGroup().id)}'
  location: location
  sku: {
    name: 'Standard_LRS'
  }
  kind: 'StorageV2'
}

output accountId string = account.id
"#;

pub const UNRESOLVED_MODULE: &str = r#"module m './missing.bicep' = {
  name: 'm'
}
"#;

pub const LOOPS_AND_CONDITIONS: &str = r#"param names array
param deploy bool = true

var upper = [for n in names: toUpper(n)]

resource accounts 'Microsoft.Storage/storageAccounts@2022-09-01' = [for (n, i) in names: if (deploy) {
  name: '${n}${i}'
  sku: {
    name: 'Standard_LRS'
  }
  kind: 'StorageV2'
}]

output first string = upper[0]
output count int = length(names)
"#;

/// Inputs that exercise recovery paths in the lexer and parser.
pub const MALFORMED_INPUTS: &[&str] = &[
    "",
    "param",
    "param x =",
    "param x string =",
    "var = 1",
    "output o int = (1 + ",
    "resource r 'Microsoft.Storage/storageAccounts@2022-09-01' = {",
    "module m './a.bicep' = [for i in range(0, 3):",
    "var s = 'unterminated",
    "var s = '${",
    "/* open comment",
    "var x = 1 ? : 2",
    "@@@",
    "}}}]]])))",
    "var a = [1,,2]",
    "var o = { a: 1, , b: }",
    "func f(x string) string =>",
    "type t = {",
    "var \u{1F600} = 1",
    "\u{0}\u{1}\u{2}",
    "var n = 99999999999999999999999999",
    "targetScope =",
    "using",
    "import * as x from",
];
