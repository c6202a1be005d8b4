//! Android ABI name mapping
//!
//! Gradle and the NDK speak ABI names (`arm64-v8a`); the runtime prefix lays
//! libraries out by short arch name (`arm64`).

/// (abi, arch) pairs supported by the runtime
pub const ABI_ARCH_PAIRS: [(&str, &str); 4] = [
    ("armeabi-v7a", "arm"),
    ("arm64-v8a", "arm64"),
    ("x86", "x86"),
    ("x86_64", "x86_64"),
];

/// Map an ABI name to the runtime's short arch name
pub fn abi_to_arch(abi: &str) -> Option<&'static str> {
    ABI_ARCH_PAIRS
        .iter()
        .find(|(a, _)| *a == abi)
        .map(|(_, arch)| *arch)
}

/// Map a short arch name back to the ABI name
pub fn arch_to_abi(arch: &str) -> Option<&'static str> {
    ABI_ARCH_PAIRS
        .iter()
        .find(|(_, a)| *a == arch)
        .map(|(abi, _)| *abi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for (abi, arch) in ABI_ARCH_PAIRS {
            assert_eq!(abi_to_arch(abi), Some(arch));
            assert_eq!(arch_to_abi(arch), Some(abi));
        }
    }

    #[test]
    fn test_unknown_abi() {
        assert_eq!(abi_to_arch("mips"), None);
    }
}
