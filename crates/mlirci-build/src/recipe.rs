//! ソースツリーからツールチェーンの期待値を読み取る

use crate::error::{BuildError, BuildResult};
use regex::Regex;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// llvm-project のコミットを checkout しているスクリプト
pub const CLONE_SCRIPT: &str = "utils/clone-mlir.sh";
/// コミット抽出パターン
pub const CHECKOUT_PATTERN: &str = r"git checkout ([0-9a-f]+)";

const CHUNK_SIZE: usize = 1024 * 1024;

/// ファイルの SHA-1（16 進小文字）
pub fn file_sha1(path: &Path) -> BuildResult<String> {
    let mut file = File::open(path).map_err(|source| read_error(path, source))?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|source| read_error(path, source))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn read_error(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::SourceRead {
        path: path.to_path_buf(),
        source,
    }
}

/// ファイル内で最初にマッチしたパターンの 1 番目のグループを返す
pub fn extract_pattern(path: &Path, pattern: &str) -> BuildResult<String> {
    let content = std::fs::read_to_string(path).map_err(|source| read_error(path, source))?;
    let regex = Regex::new(pattern).map_err(|e| BuildError::PatternNotFound {
        path: path.to_path_buf(),
        pattern: format!("{} ({})", pattern, e),
    })?;

    regex
        .captures(&content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| BuildError::PatternNotFound {
            path: path.to_path_buf(),
            pattern: pattern.to_string(),
        })
}

/// clone-mlir.sh が checkout する llvm-project のコミット
pub fn toolchain_commit(source_root: &Path) -> BuildResult<String> {
    extract_pattern(&source_root.join(CLONE_SCRIPT), CHECKOUT_PATTERN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_file_sha1() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("Dockerfile");
        fs::write(&path, "abc").unwrap();

        assert_eq!(
            file_sha1(&path).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_file_sha1_spans_chunks() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("big");
        let data = vec![b'x'; CHUNK_SIZE * 2 + 17];
        fs::write(&path, &data).unwrap();

        let mut hasher = Sha1::new();
        hasher.update(&data);
        assert_eq!(file_sha1(&path).unwrap(), hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_toolchain_commit() {
        let temp_dir = tempdir().unwrap();
        fs::create_dir(temp_dir.path().join("utils")).unwrap();
        fs::write(
            temp_dir.path().join(CLONE_SCRIPT),
            "git clone -n https://github.com/llvm/llvm-project.git\n\
             # Check out a specific branch that is known to work with ONNX-MLIR.\n\
             cd llvm-project && git checkout 29b92d07746fac26cd64c914bc9c5c3833974f6d && cd ..\n",
        )
        .unwrap();

        assert_eq!(
            toolchain_commit(temp_dir.path()).unwrap(),
            "29b92d07746fac26cd64c914bc9c5c3833974f6d"
        );
    }

    #[test]
    fn test_pattern_not_found() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("clone-mlir.sh");
        fs::write(&path, "git clone https://github.com/llvm/llvm-project.git\n").unwrap();

        assert!(matches!(
            extract_pattern(&path, CHECKOUT_PATTERN),
            Err(BuildError::PatternNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_clone_script() {
        let temp_dir = tempdir().unwrap();
        let err = toolchain_commit(temp_dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::SourceRead { .. }));
        assert!(err.user_message().contains("clone-mlir.sh"));
    }
}
