//! Fake `cm` client used by the integration tests
//!
//! The script answers `cm shell` requests one line at a time, like the real client:
//! each reply ends with a `CommandResult <code>` line. Besides the verbs the provider
//! issues, a few verbs exist only to exercise the transport failure modes.

#![allow(dead_code)]

/// Placeholder replaced by the workspace root when the script is written
pub const ROOT_PLACEHOLDER: &str = "@ROOT@";

pub const FAKE_CM: &str = r#"#!/bin/sh
# Fake 'cm shell' for the plastic-shell integration tests.
ROOT='@ROOT@'

reply() { printf '%s\n' "$@"; }
result() { printf 'CommandResult %s\n' "$1"; }

[ "$1" = "shell" ] || { reply "usage: cm shell"; exit 1; }

while IFS= read -r line; do
  verb=${line%% *}
  case "$verb" in
    exit)
      exit 0 ;;
    version)
      reply "11.0.16.8200"; result 0 ;;
    whoami)
      reply "alice"; result 0 ;;
    profile)
      reply "localhost:8087;alice"; result 0 ;;
    getworkspacefrompath)
      reply "test-ws"; result 0 ;;
    checkconnection)
      reply "Test connection executed successfully"; result 0 ;;
    status)
      case "$line" in
        *--wkconfig*) reply "Branch /main@Repo@localhost:8087" ;;
        *--header*) reply "STATUS;12;Repo;localhost:8087" ;;
        *) reply "STATUS;12;Repo;localhost:8087" \
                 "CO+CH;$ROOT/Content/A.uasset;False;NO_MERGES" \
                 "PR;$ROOT/notes.txt;False;NO_MERGES" ;;
      esac
      result 0 ;;
    fileinfo)
      reply "40;41;Repo@localhost:8087;;;/Content/A.uasset"; result 0 ;;
    lock)
      case "$line" in
        lock\ list*) reply "3b2f;12;Repo@localhost:8087;2024-01-10T10:02:45+01:00;/main;br:/main;/main/task;br:/main/task;Locked;jane@example.com;jane_ws;/Content/A.uasset" ;;
        *) reply "Lock released" ;;
      esac
      result 0 ;;
    history)
      xml=${line#*--xml=\"}
      xml=${xml%%\"*}
      cat > "$xml" <<XML
<?xml version="1.0" encoding="utf-8"?>
<RevisionHistoriesResult>
  <RevisionHistories>
    <RevisionHistory>
      <ItemName>$ROOT/Content/A.uasset</ItemName>
      <Revisions>
        <Revision><Branch>/main</Branch><CreationDate>2024-03-01T10:00:00+01:00</CreationDate><RevisionType>bin</RevisionType><ChangesetNumber>40</ChangesetNumber><Owner>jane@example.com</Owner><Comment>First import</Comment><Size>1024</Size></Revision>
        <Revision><Branch>/main</Branch><CreationDate>2024-03-05T10:00:00+01:00</CreationDate><RevisionType>bin</RevisionType><ChangesetNumber>41</ChangesetNumber><Owner>bob@example.com</Owner><Comment>Brighter lights</Comment><Size>2048</Size></Revision>
      </Revisions>
    </RevisionHistory>
  </RevisionHistories>
</RevisionHistoriesResult>
XML
      result 0 ;;
    find)
      case "$line" in
        *branches*)
          reply '<?xml version="1.0" encoding="utf-8" ?>' '<PLASTICQUERY>' \
                '<BRANCH><NAME>/main</NAME><OWNER>alice</OWNER><DATE>2024-01-02T10:00:00+01:00</DATE><REPNAME>Repo</REPNAME><REPSERVER>localhost:8087</REPSERVER></BRANCH>' \
                '<BRANCH><NAME>/main/task001</NAME><OWNER>bob</OWNER><DATE>2024-02-02T10:00:00+01:00</DATE><REPNAME>Repo</REPNAME><REPSERVER>localhost:8087</REPSERVER></BRANCH>' \
                '</PLASTICQUERY>'
          result 0 ;;
        *)
          reply "Unsupported query"; result 1 ;;
      esac ;;
    checkout)
      reply "The selected items are about to be checked out. Please wait ..." "Item $ROOT/Content/A.uasset was correctly checked out"
      result 0 ;;
    echo)
      reply "${line#echo }"; result 0 ;;
    fail)
      reply "Something went wrong"; result 1 ;;
    locked)
      printf 'Error: %s is locked by jane\n' "${line#locked }" >&2; result 1 ;;
    crash)
      reply "partial output"; exit 3 ;;
    hang)
      reply "started"; sleep 3 ;;
    prompt)
      printf 'Configure credentials\nSelect your system [0-1] '
      read -r _answer ;;
    slow)
      name=${line#slow }
      reply "$name begins"; sleep 0.1; reply "$name ends"; result 0 ;;
    *)
      reply "Unknown command: $verb"; result 1 ;;
  esac
done
"#;
